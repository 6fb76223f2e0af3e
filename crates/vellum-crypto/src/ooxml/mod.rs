// SPDX-License-Identifier: MIT
//
// OOXML container protection: one strategy shared by word-processing,
// spreadsheet, and presentation packages, since all three are the same
// ZIP-in-CFB construction when encrypted.
//
// Lock wraps the plaintext ZIP package in an OLE compound file with
// `EncryptionInfo` (agile descriptor) and `EncryptedPackage` streams.
// Unlock reverses it. The package bytes are never parsed: the ZIP goes
// into the ciphertext as-is, which is why lock/unlock round-trips are
// byte-exact.
//
// Error precision: the format cannot reliably distinguish "wrong password"
// from "corrupted container", so every failure on this path is normalised
// to `InvalidPasswordOrCorrupted`. This is an inherited format limitation,
// kept deliberately; the concrete cause is logged at debug level. A
// plaintext package handed to unlock fails the same way: it is a ZIP,
// not a CFB container, and this strategy refuses to guess.

pub mod agile;
mod info;

use std::io::{Cursor, Read, Write};

use rand::RngCore;
use tracing::{debug, info as log_info, instrument};

use vellum_core::error::{Result, VellumError};

use info::EncryptionInfoParams;

/// Encrypt an OOXML package with the given password.
#[instrument(skip_all, fields(input_len = bytes.len()))]
pub fn lock(bytes: &[u8], password: &str) -> Result<Vec<u8>> {
    let mut rng = rand::thread_rng();
    let mut key_data_salt = [0u8; agile::BLOCK_SIZE];
    let mut password_salt = [0u8; agile::BLOCK_SIZE];
    let mut verifier_input = [0u8; agile::BLOCK_SIZE];
    let mut package_key = [0u8; agile::KEY_BYTES];
    rng.fill_bytes(&mut key_data_salt);
    rng.fill_bytes(&mut password_salt);
    rng.fill_bytes(&mut verifier_input);
    rng.fill_bytes(&mut package_key);

    let pw_hash = agile::password_hash(password, &password_salt, agile::SPIN_COUNT);

    let input_key = agile::derive_key(
        &pw_hash,
        &agile::BLOCK_VERIFIER_HASH_INPUT,
        agile::KEY_BYTES,
    );
    let value_key = agile::derive_key(
        &pw_hash,
        &agile::BLOCK_VERIFIER_HASH_VALUE,
        agile::KEY_BYTES,
    );
    let key_key = agile::derive_key(&pw_hash, &agile::BLOCK_ENCRYPTED_KEY, agile::KEY_BYTES);

    let verifier_hash = agile::sha512(&verifier_input);
    let encrypted_verifier_hash_input =
        agile::encrypt_block(&input_key, &password_salt, &verifier_input)?;
    let encrypted_verifier_hash_value =
        agile::encrypt_block(&value_key, &password_salt, &verifier_hash)?;
    let encrypted_key_value = agile::encrypt_block(&key_key, &password_salt, &package_key)?;

    let info_stream = info::write(&EncryptionInfoParams {
        key_data_salt: &key_data_salt,
        password_salt: &password_salt,
        encrypted_verifier_hash_input: &encrypted_verifier_hash_input,
        encrypted_verifier_hash_value: &encrypted_verifier_hash_value,
        encrypted_key_value: &encrypted_key_value,
    });

    let package_stream = encrypt_package(bytes, &package_key, &key_data_salt)?;
    let output = assemble_container(&info_stream, &package_stream)?;

    log_info!(output_len = output.len(), "OOXML package locked");
    Ok(output)
}

/// Decrypt an OOXML package with the given password, returning the
/// plaintext ZIP bytes.
#[instrument(skip_all, fields(input_len = bytes.len()))]
pub fn unlock(bytes: &[u8], password: &str) -> Result<Vec<u8>> {
    let mut container = cfb::CompoundFile::open(Cursor::new(bytes.to_vec())).map_err(|err| {
        debug!(%err, "input is not an OLE compound file");
        VellumError::InvalidPasswordOrCorrupted
    })?;

    let info_stream = read_stream(&mut container, "EncryptionInfo")?;
    let package_stream = read_stream(&mut container, "EncryptedPackage")?;

    let descriptor = info::parse(&info_stream)?;
    let pw_hash = agile::password_hash(password, &descriptor.password_salt, descriptor.spin_count);

    // Password verifier: decrypt the stored verifier input, hash it, and
    // compare against the stored hash. A mismatch is indistinguishable
    // from corruption by construction.
    let input_key = agile::derive_key(
        &pw_hash,
        &agile::BLOCK_VERIFIER_HASH_INPUT,
        agile::KEY_BYTES,
    );
    let verifier_input = agile::decrypt_block(
        &input_key,
        &descriptor.password_salt,
        &descriptor.encrypted_verifier_hash_input,
    )?;

    let value_key = agile::derive_key(
        &pw_hash,
        &agile::BLOCK_VERIFIER_HASH_VALUE,
        agile::KEY_BYTES,
    );
    let verifier_value = agile::decrypt_block(
        &value_key,
        &descriptor.password_salt,
        &descriptor.encrypted_verifier_hash_value,
    )?;

    let expected = agile::sha512(&verifier_input[..agile::BLOCK_SIZE.min(verifier_input.len())]);
    if verifier_value.len() < agile::HASH_SIZE || verifier_value[..agile::HASH_SIZE] != expected {
        debug!("password verifier mismatch");
        return Err(VellumError::InvalidPasswordOrCorrupted);
    }

    let key_key = agile::derive_key(&pw_hash, &agile::BLOCK_ENCRYPTED_KEY, agile::KEY_BYTES);
    let package_key_full = agile::decrypt_block(
        &key_key,
        &descriptor.password_salt,
        &descriptor.encrypted_key_value,
    )?;
    if package_key_full.len() < agile::KEY_BYTES {
        debug!("encrypted key value too short");
        return Err(VellumError::InvalidPasswordOrCorrupted);
    }

    let plaintext = decrypt_package(
        &package_stream,
        &package_key_full[..agile::KEY_BYTES],
        &descriptor.key_data_salt,
    )?;

    log_info!(output_len = plaintext.len(), "OOXML package unlocked");
    Ok(plaintext)
}

// -- EncryptedPackage stream --------------------------------------------------

/// 8-byte little-endian plaintext length, then AES-CBC ciphertext in
/// 4096-byte segments with per-segment IVs.
fn encrypt_package(plaintext: &[u8], key: &[u8], key_data_salt: &[u8]) -> Result<Vec<u8>> {
    let mut stream = Vec::with_capacity(8 + plaintext.len() + agile::BLOCK_SIZE);
    stream.extend_from_slice(&(plaintext.len() as u64).to_le_bytes());

    for (index, segment) in plaintext.chunks(agile::SEGMENT_SIZE).enumerate() {
        let iv = agile::segment_iv(key_data_salt, index as u32);
        let ciphertext = agile::encrypt_block(key, &iv, segment)?;
        stream.extend_from_slice(&ciphertext);
    }

    Ok(stream)
}

fn decrypt_package(stream: &[u8], key: &[u8], key_data_salt: &[u8]) -> Result<Vec<u8>> {
    if stream.len() < 8 {
        debug!("EncryptedPackage stream truncated");
        return Err(VellumError::InvalidPasswordOrCorrupted);
    }

    let mut length_bytes = [0u8; 8];
    length_bytes.copy_from_slice(&stream[..8]);
    let plaintext_len = u64::from_le_bytes(length_bytes) as usize;

    let ciphertext = &stream[8..];
    if ciphertext.len() % agile::BLOCK_SIZE != 0 || ciphertext.len() < plaintext_len {
        debug!(
            ciphertext_len = ciphertext.len(),
            plaintext_len, "EncryptedPackage length fields inconsistent"
        );
        return Err(VellumError::InvalidPasswordOrCorrupted);
    }

    // Each ciphered segment is the zero-padded image of a 4096-byte
    // plaintext segment, so segment boundaries land on 4096 here too
    // (except the last).
    let padded_segment = agile::SEGMENT_SIZE.next_multiple_of(agile::BLOCK_SIZE);
    let mut plaintext = Vec::with_capacity(ciphertext.len());
    for (index, segment) in ciphertext.chunks(padded_segment).enumerate() {
        let iv = agile::segment_iv(key_data_salt, index as u32);
        plaintext.extend_from_slice(&agile::decrypt_block(key, &iv, segment)?);
    }

    plaintext.truncate(plaintext_len);
    Ok(plaintext)
}

// -- CFB container ------------------------------------------------------------

fn assemble_container(info_stream: &[u8], package_stream: &[u8]) -> Result<Vec<u8>> {
    let mut container = cfb::CompoundFile::create(Cursor::new(Vec::new()))
        .map_err(|err| VellumError::Internal(format!("failed to create CFB container: {err}")))?;

    write_stream(&mut container, "EncryptionInfo", info_stream)?;
    write_stream(&mut container, "EncryptedPackage", package_stream)?;

    let cursor = container.into_inner();
    Ok(cursor.into_inner())
}

fn write_stream(
    container: &mut cfb::CompoundFile<Cursor<Vec<u8>>>,
    name: &str,
    data: &[u8],
) -> Result<()> {
    let mut stream = container
        .create_stream(name)
        .map_err(|err| VellumError::Internal(format!("failed to create {name} stream: {err}")))?;
    stream
        .write_all(data)
        .map_err(|err| VellumError::Internal(format!("failed to write {name} stream: {err}")))?;
    stream
        .flush()
        .map_err(|err| VellumError::Internal(format!("failed to flush {name} stream: {err}")))?;
    Ok(())
}

fn read_stream(
    container: &mut cfb::CompoundFile<Cursor<Vec<u8>>>,
    name: &str,
) -> Result<Vec<u8>> {
    let mut stream = container.open_stream(name).map_err(|err| {
        debug!(stream = name, %err, "container stream missing");
        VellumError::InvalidPasswordOrCorrupted
    })?;
    let mut data = Vec::new();
    stream.read_to_end(&mut data).map_err(|err| {
        debug!(stream = name, %err, "container stream unreadable");
        VellumError::InvalidPasswordOrCorrupted
    })?;
    Ok(data)
}
