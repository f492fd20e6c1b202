use std::path::{Path, PathBuf};
use std::{env, fs};

use crate::error::BackendError;

const USER_AUTH_PUBLIC: &str = "user_auth.pem.pub";
const USER_AUTH_PRIVATE: &str = "user_auth.pem";

#[cfg(feature = "generate-security")]
const GENERATED_KEY_BITS: usize = 4096;

#[derive(Debug, Clone)]
pub struct KeySet {
    pub public: Vec<u8>,
    pub private: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct Security {
    pub jwt_keys: KeySet,
}

#[inline]
fn security_dir() -> PathBuf {
    PathBuf::from(env::var("SECURITY_DIR").unwrap_or("./security".to_string()))
}

impl Security {
    pub fn load() -> Result<Security, BackendError> {
        Security::load_from(security_dir())
    }

    pub fn load_from(dir: impl AsRef<Path>) -> Result<Security, BackendError> {
        let dir = dir.as_ref();

        tracing::info!("Loading JWT signing keys...");
        let pub_key = fs::read(dir.join(USER_AUTH_PUBLIC)).ok();
        let priv_key = fs::read(dir.join(USER_AUTH_PRIVATE)).ok();

        let jwt_keys = match (pub_key, priv_key) {
            (Some(public), Some(private)) => {
                tracing::info!("Loaded JWT keys.");
                KeySet { public, private }
            }
            #[cfg(feature = "generate-security")]
            _ => generate_keys(dir)?,
            #[cfg(not(feature = "generate-security"))]
            _ => {
                return Err(BackendError::Security(format!(
                    "unable to load user auth key pair from '{}'",
                    dir.display()
                )));
            }
        };

        Ok(Security { jwt_keys })
    }

    pub fn from_pem(public: impl Into<Vec<u8>>, private: impl Into<Vec<u8>>) -> Security {
        Security {
            jwt_keys: KeySet {
                public: public.into(),
                private: private.into(),
            },
        }
    }

    /// Fixed key pair checked in for tests.
    #[cfg(test)]
    pub fn test() -> Security {
        Security::from_pem(
            include_bytes!("../security/test/user_auth.pem.pub").to_vec(),
            include_bytes!("../security/test/user_auth.pem").to_vec(),
        )
    }
}

#[cfg(feature = "generate-security")]
fn generate_keys(dir: &Path) -> Result<KeySet, BackendError> {
    use rsa::pkcs1::{EncodeRsaPrivateKey, LineEnding};
    use rsa::pkcs8::EncodePublicKey;

    tracing::info!(
        "Unable to load private and/or public user auth key(s) from '{}'. Generating a new pair.",
        dir.display()
    );
    fs::create_dir_all(dir).map_err(security_err)?;

    tracing::info!("Generating a private RSA key. This will take a few minutes...");
    let mut rng = rand::thread_rng();
    let rsa_sk =
        rsa::RsaPrivateKey::new(&mut rng, GENERATED_KEY_BITS).map_err(security_err)?;

    tracing::info!("Creating PS256 private key...");
    let private = rsa_sk
        .to_pkcs1_pem(LineEnding::LF)
        .map_err(security_err)?
        .to_string()
        .into_bytes();

    fs::write(dir.join(USER_AUTH_PRIVATE), private.as_slice()).map_err(security_err)?;

    tracing::info!("Creating PS256 public key...");
    let public = rsa_sk
        .to_public_key()
        .to_public_key_pem(LineEnding::LF)
        .map_err(security_err)?
        .into_bytes();

    fs::write(dir.join(USER_AUTH_PUBLIC), public.as_slice()).map_err(security_err)?;

    tracing::info!("Done generating JWT keys.");

    Ok(KeySet { public, private })
}

#[cfg(feature = "generate-security")]
fn security_err(e: impl std::fmt::Display) -> BackendError {
    BackendError::Security(e.to_string())
}
