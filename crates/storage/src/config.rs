/// Which backend holds image bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    S3 { bucket: String },
    Memory,
}

/// Image storage configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Base that object keys are appended to when building public URLs.
    pub public_base_url: String,
}

impl StorageConfig {
    /// Load storage configuration from environment variables.
    ///
    /// | Env Var              | Default                                |
    /// |----------------------|----------------------------------------|
    /// | `STORAGE_BACKEND`    | `s3` (`memory` for local runs)         |
    /// | `S3_BUCKET_NAME`     | required when the backend is `s3`      |
    /// | `S3_PUBLIC_BASE_URL` | `https://s3.amazonaws.com/{bucket}`    |
    ///
    /// # Panics
    ///
    /// Panics if the backend is unknown, or if it is `s3` and
    /// `S3_BUCKET_NAME` is missing.
    pub fn from_env() -> Self {
        let backend_name = std::env::var("STORAGE_BACKEND").unwrap_or_else(|_| "s3".into());

        let backend = match backend_name.as_str() {
            "s3" => {
                let bucket = std::env::var("S3_BUCKET_NAME")
                    .expect("S3_BUCKET_NAME must be set when STORAGE_BACKEND=s3");
                assert!(!bucket.is_empty(), "S3_BUCKET_NAME must not be empty");
                StorageBackend::S3 { bucket }
            }
            "memory" => StorageBackend::Memory,
            other => panic!("Unknown STORAGE_BACKEND '{other}'. Must be one of: s3, memory"),
        };

        let public_base_url = std::env::var("S3_PUBLIC_BASE_URL").unwrap_or_else(|_| {
            match &backend {
                StorageBackend::S3 { bucket } => default_public_base_url(bucket),
                StorageBackend::Memory => "memory://images".to_string(),
            }
        });

        Self {
            backend,
            public_base_url,
        }
    }
}

/// Path-style public URL base for a bucket.
pub fn default_public_base_url(bucket: &str) -> String {
    format!("https://s3.amazonaws.com/{bucket}")
}
