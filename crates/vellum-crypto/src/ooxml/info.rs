// SPDX-License-Identifier: MIT
//
// `EncryptionInfo` stream: 8-byte version header followed by the agile
// XML descriptor. Written with a fixed template (we only ever emit one
// cipher suite); parsed with quick-xml so foreign producers' attribute
// ordering and whitespace don't matter.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use quick_xml::Reader;
use quick_xml::events::Event;
use tracing::debug;

use vellum_core::error::{Result, VellumError};

use super::agile;

/// Version header for agile encryption: major 4, minor 4, flags 0x40.
const VERSION_HEADER: [u8; 8] = [0x04, 0x00, 0x04, 0x00, 0x40, 0x00, 0x00, 0x00];

const NS_ENCRYPTION: &str = "http://schemas.microsoft.com/office/2006/encryption";
const NS_PASSWORD: &str = "http://schemas.microsoft.com/office/2006/keyEncryptor/password";

/// Everything the unlock path needs out of the XML descriptor.
#[derive(Debug)]
pub struct EncryptionDescriptor {
    pub key_data_salt: Vec<u8>,
    pub spin_count: u32,
    pub password_salt: Vec<u8>,
    pub encrypted_verifier_hash_input: Vec<u8>,
    pub encrypted_verifier_hash_value: Vec<u8>,
    pub encrypted_key_value: Vec<u8>,
}

/// Inputs for writing the descriptor on the lock path.
pub struct EncryptionInfoParams<'a> {
    pub key_data_salt: &'a [u8],
    pub password_salt: &'a [u8],
    pub encrypted_verifier_hash_input: &'a [u8],
    pub encrypted_verifier_hash_value: &'a [u8],
    pub encrypted_key_value: &'a [u8],
}

/// Serialise the `EncryptionInfo` stream (header + XML).
pub fn write(params: &EncryptionInfoParams<'_>) -> Vec<u8> {
    let xml = format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<encryption xmlns="{ns}" xmlns:p="{nsp}">"#,
            r#"<keyData saltSize="{salt_size}" blockSize="{block_size}" keyBits="{key_bits}" "#,
            r#"hashSize="{hash_size}" cipherAlgorithm="AES" cipherChaining="ChainingModeCBC" "#,
            r#"hashAlgorithm="SHA512" saltValue="{key_salt}"/>"#,
            r#"<keyEncryptors>"#,
            r#"<keyEncryptor uri="{nsp}">"#,
            r#"<p:encryptedKey spinCount="{spin_count}" saltSize="{salt_size}" "#,
            r#"blockSize="{block_size}" keyBits="{key_bits}" hashSize="{hash_size}" "#,
            r#"cipherAlgorithm="AES" cipherChaining="ChainingModeCBC" hashAlgorithm="SHA512" "#,
            r#"saltValue="{pw_salt}" encryptedVerifierHashInput="{verifier_input}" "#,
            r#"encryptedVerifierHashValue="{verifier_value}" encryptedKeyValue="{key_value}"/>"#,
            r#"</keyEncryptor>"#,
            r#"</keyEncryptors>"#,
            r#"</encryption>"#,
        ),
        ns = NS_ENCRYPTION,
        nsp = NS_PASSWORD,
        salt_size = agile::BLOCK_SIZE,
        block_size = agile::BLOCK_SIZE,
        key_bits = agile::KEY_BYTES * 8,
        hash_size = agile::HASH_SIZE,
        spin_count = agile::SPIN_COUNT,
        key_salt = BASE64.encode(params.key_data_salt),
        pw_salt = BASE64.encode(params.password_salt),
        verifier_input = BASE64.encode(params.encrypted_verifier_hash_input),
        verifier_value = BASE64.encode(params.encrypted_verifier_hash_value),
        key_value = BASE64.encode(params.encrypted_key_value),
    );

    let mut stream = Vec::with_capacity(VERSION_HEADER.len() + xml.len());
    stream.extend_from_slice(&VERSION_HEADER);
    stream.extend_from_slice(xml.as_bytes());
    stream
}

/// Parse an `EncryptionInfo` stream.
///
/// Only the agile variant (version 4.4) with AES-CBC/SHA-512 is accepted;
/// anything else is reported as the merged password-or-corrupted error,
/// with the concrete reason at debug level.
pub fn parse(stream: &[u8]) -> Result<EncryptionDescriptor> {
    if stream.len() < 8 || stream[..4] != VERSION_HEADER[..4] {
        debug!("EncryptionInfo missing or not the agile 4.4 variant");
        return Err(VellumError::InvalidPasswordOrCorrupted);
    }

    let xml = &stream[8..];
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut key_data_salt: Option<Vec<u8>> = None;
    let mut key_data_ok = false;
    let mut descriptor: Option<EncryptionDescriptor> = None;

    loop {
        let event = reader.read_event().map_err(|err| {
            debug!(%err, "EncryptionInfo XML is malformed");
            VellumError::InvalidPasswordOrCorrupted
        })?;

        match event {
            Event::Start(ref element) | Event::Empty(ref element) => {
                match element.local_name().as_ref() {
                    b"keyData" => {
                        let attrs = collect_attributes(element)?;
                        require_cipher_suite(&attrs)?;
                        key_data_salt = Some(required_b64(&attrs, "saltValue")?);
                        key_data_ok = true;
                    }
                    b"encryptedKey" => {
                        let attrs = collect_attributes(element)?;
                        require_cipher_suite(&attrs)?;
                        let spin_count = required_u32(&attrs, "spinCount")?;
                        if spin_count > agile::MAX_SPIN_COUNT {
                            debug!(spin_count, "spin count exceeds supported maximum");
                            return Err(VellumError::InvalidPasswordOrCorrupted);
                        }
                        descriptor = Some(EncryptionDescriptor {
                            key_data_salt: Vec::new(),
                            spin_count,
                            password_salt: required_b64(&attrs, "saltValue")?,
                            encrypted_verifier_hash_input: required_b64(
                                &attrs,
                                "encryptedVerifierHashInput",
                            )?,
                            encrypted_verifier_hash_value: required_b64(
                                &attrs,
                                "encryptedVerifierHashValue",
                            )?,
                            encrypted_key_value: required_b64(&attrs, "encryptedKeyValue")?,
                        });
                    }
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    match (key_data_ok, key_data_salt, descriptor) {
        (true, Some(salt), Some(mut descriptor)) => {
            descriptor.key_data_salt = salt;
            Ok(descriptor)
        }
        _ => {
            debug!("EncryptionInfo XML lacks keyData or password keyEncryptor");
            Err(VellumError::InvalidPasswordOrCorrupted)
        }
    }
}

fn collect_attributes(
    element: &quick_xml::events::BytesStart<'_>,
) -> Result<Vec<(String, String)>> {
    let mut attrs = Vec::new();
    for attribute in element.attributes() {
        let attribute = attribute.map_err(|err| {
            debug!(%err, "bad attribute in EncryptionInfo XML");
            VellumError::InvalidPasswordOrCorrupted
        })?;
        let key = String::from_utf8_lossy(attribute.key.local_name().as_ref()).into_owned();
        let value = String::from_utf8_lossy(&attribute.value).into_owned();
        attrs.push((key, value));
    }
    Ok(attrs)
}

fn lookup<'a>(attrs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}

fn require_cipher_suite(attrs: &[(String, String)]) -> Result<()> {
    let cipher = lookup(attrs, "cipherAlgorithm").unwrap_or_default();
    let chaining = lookup(attrs, "cipherChaining").unwrap_or_default();
    let hash = lookup(attrs, "hashAlgorithm").unwrap_or_default();
    let key_bits = lookup(attrs, "keyBits").unwrap_or_default();

    if cipher != "AES" || chaining != "ChainingModeCBC" || hash != "SHA512" || key_bits != "256" {
        debug!(
            cipher,
            chaining, hash, key_bits, "unsupported encryption variant"
        );
        return Err(VellumError::InvalidPasswordOrCorrupted);
    }
    Ok(())
}

fn required_b64(attrs: &[(String, String)], name: &str) -> Result<Vec<u8>> {
    let raw = lookup(attrs, name).ok_or_else(|| {
        debug!(attribute = name, "missing EncryptionInfo attribute");
        VellumError::InvalidPasswordOrCorrupted
    })?;
    BASE64.decode(raw).map_err(|err| {
        debug!(attribute = name, %err, "attribute is not valid base64");
        VellumError::InvalidPasswordOrCorrupted
    })
}

fn required_u32(attrs: &[(String, String)], name: &str) -> Result<u32> {
    lookup(attrs, name)
        .and_then(|raw| raw.parse().ok())
        .ok_or_else(|| {
            debug!(attribute = name, "missing or non-numeric attribute");
            VellumError::InvalidPasswordOrCorrupted
        })
}
