use http::header::HeaderName;

pub const HEADER_WECHATPAY_TIMESTAMP: HeaderName = HeaderName::from_static("wechatpay-timestamp");
pub const HEADER_WECHATPAY_NONCE: HeaderName = HeaderName::from_static("wechatpay-nonce");
pub const HEADER_WECHATPAY_SIGNATURE: HeaderName = HeaderName::from_static("wechatpay-signature");
pub const HEADER_WECHATPAY_SERIAL: HeaderName = HeaderName::from_static("wechatpay-serial");

/// Authorization scheme for RSA-SHA256 signed API V3 requests.
pub const AUTHORIZATION_SCHEME: &str = "WECHATPAY2-SHA256-RSA2048";

/// `signType` reported in client-side payment invocation payloads.
pub const INVOCATION_SIGN_TYPE: &str = "RSA";

/// Keys below this modulus size are accepted but logged as weak.
pub const RECOMMENDED_RSA_BITS: usize = 2048;

/// Length of nonces produced by [`crate::request_signing::generate_nonce`].
pub const NONCE_LENGTH: usize = 32;
