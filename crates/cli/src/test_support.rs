use std::fs;
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose, Engine};
use once_cell::sync::Lazy;
use rsa::pkcs1v15::SigningKey;
use rsa::pkcs8::{EncodePrivateKey, EncodePublicKey};
use rsa::signature::{SignatureEncoding, Signer};
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;

pub struct Keypair {
    pub private_key: RsaPrivateKey,
    pub private_key_b64: String,
    pub public_key_b64: String,
}

static KEYPAIR: Lazy<Keypair> = Lazy::new(|| {
    let private_key =
        RsaPrivateKey::new(&mut rand::thread_rng(), 2048).expect("should generate RSA key");
    let public_key = RsaPublicKey::from(&private_key);

    let private_der = private_key
        .to_pkcs8_der()
        .expect("should encode private key");
    let public_der = public_key
        .to_public_key_der()
        .expect("should encode public key");

    Keypair {
        private_key_b64: general_purpose::STANDARD.encode(private_der.as_bytes()),
        public_key_b64: general_purpose::STANDARD.encode(public_der.as_bytes()),
        private_key,
    }
});

pub fn keypair() -> &'static Keypair {
    &KEYPAIR
}

/// Signs as the gateway would, independently of the crate under test.
pub fn sign_with(message: &str) -> String {
    let signing_key = SigningKey::<Sha256>::new(keypair().private_key.clone());
    let signature = signing_key.sign(message.as_bytes());
    general_purpose::STANDARD.encode(signature.to_bytes())
}

pub fn write_settings(dir: &Path) -> PathBuf {
    let path = dir.join("tenpay.toml");
    let contents = format!(
        r#"
[merchant]
app_id = "wx8888888888888888"
mch_id = "1900000109"
certificate_serial = "1DDE55AD98ED71D6EDD4A4A16996DE7B47773A8C"
private_key = "{}"

[key_cache]
min_refetch_interval_secs = 0
"#,
        keypair().private_key_b64
    );
    fs::write(&path, contents).expect("should write settings");
    path
}

pub fn write_keys(dir: &Path, serial: &str, public_key_b64: &str) -> PathBuf {
    let path = dir.join("platform_keys.toml");
    let contents = format!(
        r#"
[[accounts]]
mch_id = "1900000109"

[accounts.keys]
"{}" = "{}"
"#,
        serial, public_key_b64
    );
    fs::write(&path, contents).expect("should write key file");
    path
}
