//! Traditional OpenSSL encrypted PEM for PKCS#1 private keys
//!
//! Produces and reads the `Proc-Type: 4,ENCRYPTED` / `DEK-Info` form with
//! AES-256-CBC. The key is derived with OpenSSL's `EVP_BytesToKey` (MD5, one
//! round, salt = first eight IV bytes), so the output loads in any OpenSSL
//! based TLS stack that accepts `-passin`.

use aes::Aes256;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::Pkcs7};
use md5::{Digest, Md5};
use ::pem::{EncodeConfig, LineEnding, Pem};
use zeroize::Zeroizing;

use crate::error::{Result, X509Error};

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

const RSA_KEY_LABEL: &str = "RSA PRIVATE KEY";
const PROC_TYPE: &str = "Proc-Type";
const PROC_TYPE_ENCRYPTED: &str = "4,ENCRYPTED";
const DEK_INFO: &str = "DEK-Info";
const DEK_CIPHER: &str = "AES-256-CBC";
const KEY_LEN: usize = 32;
const IV_LEN: usize = 16;
const SALT_LEN: usize = 8;

/// Encrypt PKCS#1 DER into an encrypted `RSA PRIVATE KEY` PEM block
///
/// # Errors
///
/// Returns [`X509Error::EntropyFailure`] if no IV can be drawn.
pub fn encrypt_private_key_pem(pkcs1_der: &[u8], password: &[u8]) -> Result<String> {
    let mut iv = [0u8; IV_LEN];
    getrandom::fill(&mut iv)
        .map_err(|e| X509Error::EntropyFailure(format!("IV generation failed: {e}")))?;

    let key = bytes_to_key(password, &iv[..SALT_LEN]);
    let ciphertext =
        Aes256CbcEnc::new(&(*key).into(), &iv.into()).encrypt_padded_vec_mut::<Pkcs7>(pkcs1_der);

    let mut block = Pem::new(RSA_KEY_LABEL, ciphertext);
    let headers = block.headers_mut();
    headers
        .add(PROC_TYPE, PROC_TYPE_ENCRYPTED)
        .map_err(|e| X509Error::encoding(format!("PEM header rejected: {e}")))?;
    headers
        .add(DEK_INFO, &format!("{DEK_CIPHER},{}", hex::encode_upper(iv)))
        .map_err(|e| X509Error::encoding(format!("PEM header rejected: {e}")))?;
    Ok(encode_lf(&block))
}

/// Decrypt an encrypted `RSA PRIVATE KEY` PEM block back to PKCS#1 DER
///
/// # Errors
///
/// Returns [`X509Error::Decryption`] if the block is not in the expected
/// format, names a cipher other than AES-256-CBC, or the password is wrong.
pub fn decrypt_private_key_pem(pem: &str, password: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    let block = parse_key_block(pem)?;
    let dek_info = block
        .headers()
        .get(DEK_INFO)
        .ok_or_else(|| X509Error::Decryption("Key is not encrypted".to_string()))?;
    let iv = parse_dek_info(dek_info)?;
    let key = bytes_to_key(password, &iv[..SALT_LEN]);

    let plaintext = Aes256CbcDec::new(&(*key).into(), &iv.into())
        .decrypt_padded_vec_mut::<Pkcs7>(block.contents())
        .map_err(|_| X509Error::Decryption("Bad password or corrupted key".to_string()))?;
    Ok(Zeroizing::new(plaintext))
}

/// Whether a PEM block carries the legacy encryption headers
#[must_use]
pub fn is_encrypted_pem(pem: &str) -> bool {
    parse_key_block(pem).is_ok_and(|block| {
        block
            .headers()
            .get(PROC_TYPE)
            .is_some_and(|value| value == PROC_TYPE_ENCRYPTED)
    })
}

/// PEM text with LF line endings and 64-column wrapping
pub(crate) fn encode_lf(block: &Pem) -> String {
    ::pem::encode_config(block, EncodeConfig::new().set_line_ending(LineEnding::LF))
}

fn parse_key_block(pem: &str) -> Result<Pem> {
    let block =
        ::pem::parse(pem).map_err(|e| X509Error::Decryption(format!("Invalid PEM: {e}")))?;
    if block.tag() != RSA_KEY_LABEL {
        return Err(X509Error::Decryption(format!(
            "Expected {RSA_KEY_LABEL} block, found {}",
            block.tag()
        )));
    }
    Ok(block)
}

/// `EVP_BytesToKey` with MD5 and a single iteration
fn bytes_to_key(password: &[u8], salt: &[u8]) -> Zeroizing<[u8; KEY_LEN]> {
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    let mut filled = 0;
    let mut previous: Option<Zeroizing<Vec<u8>>> = None;

    while filled < KEY_LEN {
        let mut hasher = Md5::new();
        if let Some(prev) = &previous {
            hasher.update(prev.as_slice());
        }
        hasher.update(password);
        hasher.update(salt);
        let digest = Zeroizing::new(hasher.finalize().to_vec());

        let take = (KEY_LEN - filled).min(digest.len());
        key[filled..filled + take].copy_from_slice(&digest[..take]);
        filled += take;
        previous = Some(digest);
    }
    key
}

fn parse_dek_info(value: &str) -> Result<[u8; IV_LEN]> {
    let (cipher, iv_hex) = value
        .split_once(',')
        .ok_or_else(|| X509Error::Decryption("Malformed DEK-Info header".to_string()))?;
    if cipher.trim() != DEK_CIPHER {
        return Err(X509Error::Decryption(format!(
            "Unsupported PEM cipher {}",
            cipher.trim()
        )));
    }
    let bytes = hex::decode(iv_hex.trim())
        .map_err(|e| X509Error::Decryption(format!("Malformed IV: {e}")))?;
    bytes
        .try_into()
        .map_err(|_| X509Error::Decryption("IV must be 16 bytes".to_string()))
}
