//! PostgreSQL backend
//!
//! Connects directly to an external PostgreSQL server with the configured
//! administrative role. Every operation opens a fresh connection; the
//! configured connect timeout is the only bound on a call.

use std::sync::Arc;

use chrono::Utc;
use futures::future::{BoxFuture, FutureExt};
use rustls::pki_types::{CertificateDer, ServerName};
use tokio_postgres::config::SslMode;
use tokio_postgres::{Client, NoTls};
use tokio_postgres_rustls::MakeRustlsConnect;
use tracing::{debug, info, trace};

use super::sql::{self, sanitize_identifier};
use super::{BackendError, BackendResult, DatabaseBackend};
use crate::config::{PostgresServerConfig, TlsMode};

/// Maintenance database used for administrative connections
const ADMIN_DATABASE: &str = "postgres";

/// Backend for one PostgreSQL server
pub struct PostgresBackend {
    server: PostgresServerConfig,
    tls: Option<MakeRustlsConnect>,
}

impl std::fmt::Debug for PostgresBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresBackend")
            .field("server", &self.server)
            .field("tls", &self.tls.is_some())
            .finish()
    }
}

impl PostgresBackend {
    /// Build the backend, loading TLS material up front
    pub fn new(server: PostgresServerConfig) -> BackendResult<Self> {
        let tls = build_tls_connector(&server)?;
        Ok(Self { server, tls })
    }

    pub fn is_production(&self) -> bool {
        self.server.production
    }

    /// Open a connection to `database` as `user`
    async fn connect(
        &self,
        database: &str,
        user: &str,
        password: &str,
    ) -> Result<Client, tokio_postgres::Error> {
        let mut config = tokio_postgres::Config::new();
        config
            .host(&self.server.host)
            .port(self.server.port)
            .user(user)
            .password(password)
            .dbname(database)
            .connect_timeout(self.server.connect_timeout());

        let client = match &self.tls {
            None => {
                config.ssl_mode(SslMode::Disable);
                let (client, connection) = config.connect(NoTls).await?;
                tokio::spawn(async move {
                    if let Err(e) = connection.await {
                        trace!(error = %e, "PostgreSQL connection closed");
                    }
                });
                client
            }
            Some(tls) => {
                config.ssl_mode(SslMode::Require);
                let (client, connection) = config.connect(tls.clone()).await?;
                tokio::spawn(async move {
                    if let Err(e) = connection.await {
                        trace!(error = %e, "PostgreSQL TLS connection closed");
                    }
                });
                client
            }
        };

        debug!(
            host = %self.server.host,
            database = %database,
            user = %user,
            "PostgreSQL connection established"
        );
        Ok(client)
    }

    /// Connection with the administrative role to the maintenance database
    async fn connect_admin(&self) -> BackendResult<Client> {
        self.connect(ADMIN_DATABASE, &self.server.user, &self.server.password)
            .await
            .map_err(|source| BackendError::Connection {
                host: self.server.host.clone(),
                port: self.server.port,
                source,
            })
    }

    async fn create_database(&self, name: &str, user: &str, password: &str) -> BackendResult<()> {
        let database = sanitize_identifier(name);
        info!(
            database = %database,
            server = %self.server.host,
            "Creating PostgreSQL database"
        );

        let admin = self.connect_admin().await?;

        if admin.query_opt(sql::ROLE_EXISTS, &[&user]).await?.is_none() {
            debug!(role = %user, "Creating role");
            admin.batch_execute(&sql::create_role(user, password)).await?;
        }

        if admin
            .query_opt(sql::DATABASE_EXISTS, &[&database])
            .await?
            .is_none()
        {
            debug!(database = %database, "Creating database");
            admin.batch_execute(&sql::create_database(&database)).await?;
        } else {
            debug!(database = %database, "Database already exists");
        }

        admin.batch_execute(&sql::grant_all(&database, user)).await?;

        if !self.ping_database(&database, user, password).await {
            return Err(BackendError::UserCannotConnect {
                database,
                user: user.to_string(),
            });
        }

        Ok(())
    }

    async fn delete_database(&self, name: &str) -> BackendResult<()> {
        let database = sanitize_identifier(name);
        let admin = self.connect_admin().await?;

        if !self.is_production() {
            info!(
                database = %database,
                server = %self.server.host,
                "Dropping PostgreSQL database"
            );
            admin.batch_execute(&sql::drop_database(&database)).await?;
            return Ok(());
        }

        // Production servers keep the data around for manual recovery.
        if admin
            .query_opt(sql::DATABASE_EXISTS, &[&database])
            .await?
            .is_some()
        {
            let renamed = sql::deleted_database_name(&database, Utc::now());
            info!(
                database = %database,
                renamed = %renamed,
                server = %self.server.host,
                "Renaming PostgreSQL database instead of dropping it"
            );
            admin
                .batch_execute(&sql::rename_database(&database, &renamed))
                .await?;
        }

        Ok(())
    }

    async fn ping_database(&self, name: &str, user: &str, password: &str) -> bool {
        let database = sanitize_identifier(name);
        match self.connect(&database, user, password).await {
            Ok(_) => true,
            Err(e) => {
                debug!(database = %database, user = %user, error = %e, "Ping failed");
                false
            }
        }
    }
}

impl DatabaseBackend for PostgresBackend {
    fn create<'a>(
        &'a self,
        name: &'a str,
        user: &'a str,
        password: &'a str,
    ) -> BoxFuture<'a, BackendResult<()>> {
        self.create_database(name, user, password).boxed()
    }

    fn delete<'a>(&'a self, name: &'a str) -> BoxFuture<'a, BackendResult<()>> {
        self.delete_database(name).boxed()
    }

    fn ping<'a>(&'a self, name: &'a str, user: &'a str, password: &'a str) -> BoxFuture<'a, bool> {
        self.ping_database(name, user, password).boxed()
    }
}

// =============================================================================
// TLS Configuration
// =============================================================================

/// Parse PEM-encoded certificates into DER format
fn parse_pem_certificates(pem_data: &str) -> BackendResult<Vec<CertificateDer<'static>>> {
    let mut certs = Vec::new();
    let mut reader = std::io::BufReader::new(pem_data.as_bytes());

    for cert in rustls_pemfile::certs(&mut reader) {
        match cert {
            Ok(cert) => certs.push(cert),
            Err(e) => {
                return Err(BackendError::Tls(format!(
                    "Failed to parse certificate: {}",
                    e
                )));
            }
        }
    }

    if certs.is_empty() {
        return Err(BackendError::Tls(
            "No certificates found in PEM data".to_string(),
        ));
    }

    Ok(certs)
}

/// Client config builder pinned to the aws-lc-rs provider, independent of
/// the process-wide default
fn client_config_builder()
-> BackendResult<rustls::ConfigBuilder<rustls::ClientConfig, rustls::WantsVerifier>> {
    rustls::ClientConfig::builder_with_provider(Arc::new(
        rustls::crypto::aws_lc_rs::default_provider(),
    ))
    .with_safe_default_protocol_versions()
    .map_err(|e| BackendError::Tls(format!("Unsupported TLS configuration: {}", e)))
}

/// Build a rustls connector for the server's TLS mode, `None` for plain TCP
fn build_tls_connector(server: &PostgresServerConfig) -> BackendResult<Option<MakeRustlsConnect>> {
    match server.tls {
        TlsMode::Disable => Ok(None),
        TlsMode::Require => {
            let config = client_config_builder()?
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(NoVerifier))
                .with_no_client_auth();

            Ok(Some(MakeRustlsConnect::new(config)))
        }
        TlsMode::VerifyFull => {
            let path = server.ca_cert_file.as_ref().ok_or_else(|| {
                BackendError::Tls("verify-full requires a CA certificate file".to_string())
            })?;
            let pem = std::fs::read_to_string(path).map_err(|e| {
                BackendError::Tls(format!("Failed to read {}: {}", path.display(), e))
            })?;

            let mut root_store = rustls::RootCertStore::empty();
            for cert in parse_pem_certificates(&pem)? {
                root_store.add(cert).map_err(|e| {
                    BackendError::Tls(format!("Failed to add CA cert: {}", e))
                })?;
            }

            let config = client_config_builder()?
                .with_root_certificates(root_store)
                .with_no_client_auth();

            Ok(Some(MakeRustlsConnect::new(config)))
        }
    }
}

/// Certificate verifier that accepts any certificate, for `tls: require`
#[derive(Debug)]
struct NoVerifier;

impl rustls::client::danger::ServerCertVerifier for NoVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        vec![
            rustls::SignatureScheme::RSA_PKCS1_SHA256,
            rustls::SignatureScheme::RSA_PKCS1_SHA384,
            rustls::SignatureScheme::RSA_PKCS1_SHA512,
            rustls::SignatureScheme::ECDSA_NISTP256_SHA256,
            rustls::SignatureScheme::ECDSA_NISTP384_SHA384,
            rustls::SignatureScheme::ECDSA_NISTP521_SHA512,
            rustls::SignatureScheme::RSA_PSS_SHA256,
            rustls::SignatureScheme::RSA_PSS_SHA384,
            rustls::SignatureScheme::RSA_PSS_SHA512,
            rustls::SignatureScheme::ED25519,
        ]
    }
}
