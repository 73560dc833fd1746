// src/config.rs

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;

use crate::{
    db::PgStore,
    services::{
        auth::AuthService,
        document_service::{DocumentService, PdfGrnRenderer},
        lifecycle_service::LifecycleService,
        outbound_service::OutboundService,
        photo_service::PhotoService,
        sync_service::SyncService,
    },
};

/// Variáveis de ambiente do serviço.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub uploads_dir: PathBuf,
    pub fonts_dir: PathBuf,
    pub db_max_connections: u32,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_source(|key| std::env::var(key).ok())
    }

    /// Lê a configuração de qualquer fonte chave -> valor (env, mapa de teste...).
    pub fn from_source<F>(get: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = get("DATABASE_URL").context("DATABASE_URL deve ser definida")?;
        let jwt_secret = get("JWT_SECRET").context("JWT_SECRET deve ser definido")?;

        let db_max_connections = match get("DB_MAX_CONNECTIONS") {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("DB_MAX_CONNECTIONS inválido: '{raw}'"))?,
            None => 5,
        };

        Ok(Self {
            database_url,
            jwt_secret,
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
            uploads_dir: get("UPLOADS_DIR").unwrap_or_else(|| "./uploads".to_string()).into(),
            fonts_dir: get("FONTS_DIR").unwrap_or_else(|| "./fonts".to_string()).into(),
            db_max_connections,
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub store: PgStore,
    pub auth_service: AuthService,
    pub lifecycle_service: LifecycleService<PgStore>,
    pub outbound_service: OutboundService<PgStore>,
    pub sync_service: SyncService<PgStore>,
}

impl AppState {
    pub async fn new(config: AppConfig) -> anyhow::Result<Self> {
        let db_pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await
            .context("Falha ao conectar no banco de dados")?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        // --- Monta o gráfico de dependências ---
        let store = PgStore::new(db_pool);
        let photos = PhotoService::new(config.uploads_dir.clone());
        let documents = DocumentService::new(Arc::new(PdfGrnRenderer::new(config.fonts_dir.clone())), photos.clone());

        let lifecycle_service = LifecycleService::new(store.clone(), photos.clone());
        let outbound_service = OutboundService::new(store.clone(), documents, photos);
        let sync_service = SyncService::new(store.clone(), lifecycle_service.clone(), outbound_service.clone());

        Ok(Self {
            auth_service: AuthService::new(config.jwt_secret.clone()),
            store,
            lifecycle_service,
            outbound_service,
            sync_service,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn source(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_fill_optional_values() {
        let config = AppConfig::from_source(source(&[
            ("DATABASE_URL", "postgres://localhost/warehouse"),
            ("JWT_SECRET", "segredo"),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr, "0.0.0.0:3000");
        assert_eq!(config.uploads_dir, PathBuf::from("./uploads"));
        assert_eq!(config.fonts_dir, PathBuf::from("./fonts"));
        assert_eq!(config.db_max_connections, 5);
    }

    #[test]
    fn missing_secret_is_an_error() {
        let err = AppConfig::from_source(source(&[("DATABASE_URL", "postgres://x")])).unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"));
    }

    #[test]
    fn bad_pool_size_is_rejected() {
        let err = AppConfig::from_source(source(&[
            ("DATABASE_URL", "postgres://x"),
            ("JWT_SECRET", "s"),
            ("DB_MAX_CONNECTIONS", "muitas"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("DB_MAX_CONNECTIONS"));
    }
}
