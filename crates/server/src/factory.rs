//! Builds the shared [`AppState`] from configuration.

use std::sync::Arc;
use std::time::Duration;

use exposr_core::DeleteCodeHasher;
use exposr_detector::{DynDetector, HuggingFaceDetector, SimulatedDetector, SimulationProfile};
use exposr_intake::FileValidator;
use exposr_media::MediaHost;
use exposr_media_cloudinary::CloudinaryMediaHost;
use exposr_media_memory::MemoryMediaHost;
use exposr_store::{RecordStore, ResultRepository};
use exposr_store_airtable::AirtableRecordStore;
use exposr_store_memory::MemoryRecordStore;
use rand::RngCore;
use rand::rngs::OsRng;
use tracing::{info, warn};

use crate::api::{ApiSettings, AppState};
use crate::auth::AdminAuth;
use crate::auth::crypto::AtRestCipher;
use crate::config::{
    AnalysisBackend, AnalysisConfig, ExposrConfig, MediaBackend, MediaConfig, StorageBackend,
    StorageConfig,
};
use crate::cors::OriginPolicy;
use crate::error::ServerError;
use crate::ratelimit::RateLimiter;

/// Secrets resolved from configuration, generated where allowed.
pub struct Secrets {
    pub jwt_secret: Vec<u8>,
    pub cipher: AtRestCipher,
    pub hasher: DeleteCodeHasher,
}

/// Resolve secrets. Missing ones are generated per process outside
/// production and refused in production.
pub fn resolve_secrets(config: &ExposrConfig) -> Result<Secrets, ServerError> {
    let production = config.is_production();
    let security = &config.security;

    let missing = |name: &str| -> Result<(), ServerError> {
        if production {
            return Err(ServerError::Config(format!("{name} is required in production")));
        }
        warn!(
            "{name} not set, generating a per-process value; \
             issued tokens and codes will not survive a restart"
        );
        Ok(())
    };

    let jwt_secret = if let Some(secret) = &security.jwt_secret {
        secret.as_bytes().to_vec()
    } else {
        missing("JWT_SECRET")?;
        let mut secret = vec![0u8; 64];
        OsRng.fill_bytes(&mut secret);
        secret
    };

    let cipher = if let Some(key) = &security.encryption_key {
        AtRestCipher::from_encoded(key).map_err(ServerError::Config)?
    } else {
        missing("ENCRYPTION_KEY")?;
        AtRestCipher::ephemeral()
    };

    let hasher = if let Some(secret) = &security.delete_code_secret {
        DeleteCodeHasher::new(secret.as_bytes())
    } else {
        missing("DELETE_CODE_SECRET")?;
        DeleteCodeHasher::ephemeral()
    };

    Ok(Secrets {
        jwt_secret,
        cipher,
        hasher,
    })
}

/// Construct the analysis backend.
///
/// Without a Hugging Face key the simulated backend is used in development;
/// production refuses to start.
pub fn create_detector(
    config: &AnalysisConfig,
    production: bool,
) -> Result<Arc<dyn DynDetector>, ServerError> {
    if config.backend == AnalysisBackend::HuggingFace {
        if let Some(hf) = config.huggingface.to_detector_config(config.timeout()) {
            let detector = HuggingFaceDetector::new(hf)
                .map_err(|e| ServerError::Config(format!("huggingface detector: {e}")))?;
            info!("analysis backend: huggingface");
            return Ok(Arc::new(detector));
        }
        if production {
            return Err(ServerError::Config(
                "HUGGINGFACE_API_KEY is required in production".into(),
            ));
        }
        warn!("HUGGINGFACE_API_KEY not set, falling back to the simulated analysis backend");
    } else if production {
        return Err(ServerError::Config(
            "the simulated analysis backend is not available in production".into(),
        ));
    }
    info!("analysis backend: simulated");
    Ok(Arc::new(SimulatedDetector::new(SimulationProfile::default())))
}

pub fn create_store(config: &StorageConfig) -> Result<Arc<dyn RecordStore>, ServerError> {
    match config.backend {
        StorageBackend::Memory => {
            info!("record store: memory");
            Ok(Arc::new(MemoryRecordStore::new()))
        }
        StorageBackend::Airtable => {
            let airtable = config.airtable.clone().ok_or_else(|| {
                ServerError::Config("airtable backend requires [storage.airtable]".into())
            })?;
            let store = AirtableRecordStore::new(airtable)
                .map_err(|e| ServerError::Config(format!("airtable store: {e}")))?;
            info!("record store: airtable");
            Ok(Arc::new(store))
        }
    }
}

pub fn create_media(config: &MediaConfig) -> Result<Option<Arc<dyn MediaHost>>, ServerError> {
    match config.backend {
        MediaBackend::None => {
            info!("media host: none");
            Ok(None)
        }
        MediaBackend::Memory => {
            info!("media host: memory");
            Ok(Some(Arc::new(MemoryMediaHost::default())))
        }
        MediaBackend::Cloudinary => {
            let cloudinary = config.cloudinary.clone().ok_or_else(|| {
                ServerError::Config("cloudinary backend requires [media.cloudinary]".into())
            })?;
            let host = CloudinaryMediaHost::new(cloudinary)
                .map_err(|e| ServerError::Config(format!("cloudinary media host: {e}")))?;
            info!("media host: cloudinary");
            Ok(Some(Arc::new(host)))
        }
    }
}

/// Assemble the application state from a validated configuration.
pub fn build_state(config: &ExposrConfig) -> Result<AppState, ServerError> {
    let secrets = resolve_secrets(config)?;
    let detector = create_detector(&config.analysis, config.is_production())?;

    let mut repository = ResultRepository::new(create_store(&config.storage)?, secrets.hasher)
        .with_sealer(Arc::new(secrets.cipher));
    if let Some(media) = create_media(&config.media)? {
        repository = repository.with_media(media);
    }

    let auth = AdminAuth::new(
        config.admin.password_hash.clone(),
        &secrets.jwt_secret,
        config.admin.token_ttl_seconds,
    );
    if !auth.is_configured() {
        warn!("ADMIN_PASSWORD_HASH not set, admin login is disabled");
    }

    let limits = &config.rate_limit;
    let (rate_limiter, login_limiter) = if limits.enabled {
        (
            Some(Arc::new(RateLimiter::new(
                Duration::from_secs(limits.window_seconds),
                limits.max_requests,
            ))),
            Some(Arc::new(RateLimiter::new(
                Duration::from_secs(limits.login_window_seconds),
                limits.login_max_attempts,
            ))),
        )
    } else {
        warn!("rate limiting is disabled");
        (None, None)
    };

    Ok(AppState {
        repository: Arc::new(repository),
        detector,
        validator: Arc::new(FileValidator::new(config.uploads.clone())),
        auth: Arc::new(auth),
        rate_limiter,
        login_limiter,
        settings: Arc::new(ApiSettings {
            analysis_timeout: config.analysis.timeout(),
            trust_proxy: config.server.trust_proxy,
            origins: OriginPolicy::new(&config.cors, config.server.environment),
        }),
    })
}
