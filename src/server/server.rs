use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_port::*;
use crate::infra_memory::*;
use crate::infra_mysql::*;
use crate::logger::*;
use crate::server::ExpiredTokenPurger;
use crate::settings::Settings;
use anyhow::anyhow;
use sqlx::MySqlPool;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const DEV_SIGNING_KEY: &str = "tollgate-dev-secret-key";

pub struct Server {
    pub auth_service: Arc<dyn AuthService>,
    pub user_service: Arc<dyn UserService>,
    token_store: Arc<dyn RefreshTokenStore>,
    clock: Arc<dyn Clock>,
    purge_handle: Mutex<Option<JoinHandle<()>>>,
    cancel: CancellationToken,
    pool: Option<MySqlPool>,
}

impl Server {
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let (token_store, user_repo, pool): (
            Arc<dyn RefreshTokenStore>,
            Arc<dyn UserRepo>,
            Option<MySqlPool>,
        ) = match settings.store.backend.as_str() {
            "memory" => (
                Arc::new(MemoryRefreshTokenStore::new()),
                Arc::new(MemoryUserRepo::new()),
                None,
            ),
            "mysql" => {
                let dsn = settings
                    .store
                    .mysql_dsn
                    .as_deref()
                    .ok_or_else(|| anyhow!("store.mysql_dsn is required for the mysql backend"))?;
                let pool = MySqlPool::connect(dsn).await?;
                (
                    Arc::new(MySqlRefreshTokenStore::new(pool.clone())),
                    Arc::new(MySqlUserRepo::new(pool.clone())),
                    Some(pool),
                )
            }
            other => return Err(anyhow!("Unknown store backend: {}", other)),
        };

        let jwt = JwtConfig {
            issuer: settings.token.issuer.clone(),
            audience: settings.token.audience.clone(),
            signing_key: signing_key()?,
        };
        let policy = TokenPolicy {
            access_ttl: secs_to_duration(settings.token.access_ttl_secs)?,
            refresh_ttl: secs_to_duration(settings.token.refresh_ttl_secs)?,
        };

        let mut server = Self::assemble(token_store, user_repo, jwt, policy, clock);
        server.pool = pool;

        if settings.purge.enabled {
            server.start_purger(
                std::time::Duration::from_secs(settings.purge.interval_secs.max(1)),
                secs_to_duration(settings.purge.retention_secs)?,
            );
        }

        info!(backend = %settings.store.backend, "server started");
        Ok(server)
    }

    /// Wires the services over the given stores. No background tasks.
    pub fn assemble(
        token_store: Arc<dyn RefreshTokenStore>,
        user_repo: Arc<dyn UserRepo>,
        jwt: JwtConfig,
        policy: TokenPolicy,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let credential_hasher: Arc<dyn CredentialHasher> = Arc::new(Argon2PasswordHasher);
        let token_codec: Arc<dyn TokenCodec> = Arc::new(JwtHs256Codec::new(jwt));
        let token_lifecycle: Arc<dyn TokenLifecycle> = Arc::new(RealTokenLifecycle::new(
            token_store.clone(),
            token_codec,
            clock.clone(),
            policy,
        ));

        let auth_service: Arc<dyn AuthService> = Arc::new(RealAuthService::new(
            user_repo.clone(),
            credential_hasher,
            token_lifecycle,
            clock.clone(),
        ));
        let user_service: Arc<dyn UserService> =
            Arc::new(RealUserService::new(user_repo, clock.clone()));

        Self {
            auth_service,
            user_service,
            token_store,
            clock,
            purge_handle: Mutex::new(None),
            cancel: CancellationToken::new(),
            pool: None,
        }
    }

    fn start_purger(&self, interval: std::time::Duration, retention: chrono::Duration) {
        let purger = ExpiredTokenPurger::new(
            self.token_store.clone(),
            self.clock.clone(),
            interval,
            retention,
            self.cancel.clone(),
        );
        let handle = tokio::spawn(async move { purger.run().await });
        *self.purge_handle.lock().unwrap_or_else(|e| e.into_inner()) = Some(handle);
    }

    pub async fn shutdown(&self) {
        info!("server shutting down...");

        self.cancel.cancel();

        let handle = self
            .purge_handle
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(handle) = handle {
            let r = handle.await;
            info!("purger handle dropped: {:?}", r);
        }

        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }
}

fn signing_key() -> anyhow::Result<Vec<u8>> {
    match std::env::var("JWT_SIGNING_KEY") {
        Ok(key) if !key.is_empty() => Ok(key.into_bytes()),
        _ if cfg!(debug_assertions) => {
            warn!("JWT_SIGNING_KEY not set, falling back to the development key");
            Ok(DEV_SIGNING_KEY.as_bytes().to_vec())
        }
        _ => Err(anyhow!("JWT_SIGNING_KEY must be set")),
    }
}

fn secs_to_duration(secs: u64) -> anyhow::Result<chrono::Duration> {
    i64::try_from(secs)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .ok_or_else(|| anyhow!("duration out of range: {secs}s"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn memory_server() -> Server {
        Server::assemble(
            Arc::new(MemoryRefreshTokenStore::new()),
            Arc::new(MemoryUserRepo::new()),
            JwtConfig {
                issuer: "tollgate.test".into(),
                audience: "tests".into(),
                signing_key: b"server-test-key".to_vec(),
            },
            TokenPolicy::default(),
            Arc::new(ManualClock::new(Utc::now())),
        )
    }

    #[tokio::test]
    async fn purger_handle_survives_a_poisoned_lock() {
        let server = Arc::new(memory_server());

        let poisoner = server.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.purge_handle.lock().unwrap();
            panic!("poison the purge handle lock");
        })
        .join();
        assert!(server.purge_handle.is_poisoned());

        server.start_purger(std::time::Duration::from_secs(3600), chrono::Duration::days(7));
        assert!(
            server
                .purge_handle
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .is_some()
        );

        server.shutdown().await;
        assert!(
            server
                .purge_handle
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .is_none()
        );
    }
}
