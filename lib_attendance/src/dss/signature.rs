//! Challenge-response signatures. All digests are lower-case hex MD5.

/// Lower-case hex MD5 of `input`.
pub fn md5_hex(input: &str) -> String {
    format!("{:x}", md5::compute(input.as_bytes()))
}

/// Login signature for the second authorize call.
///
/// `md5(md5(user:realm:md5(md5(user + md5(password)))):randomKey)`
pub fn login_signature(user: &str, password: &str, realm: &str, random_key: &str) -> String {
    let t1 = md5_hex(password);
    let t2 = md5_hex(&format!("{user}{t1}"));
    let t3 = md5_hex(&t2);
    let t4 = md5_hex(&format!("{user}:{realm}:{t3}"));
    md5_hex(&format!("{t4}:{random_key}"))
}

/// Signature for `/accounts/updateToken`.
pub fn rotation_signature(secret: &str, token: &str) -> String {
    md5_hex(&format!("{secret}:{token}"))
}
