// SPDX-License-Identifier: MIT
//
// ECMA-376 Agile Encryption primitives: password hashing, block-key
// derivation, and AES-CBC segment ciphering. The hash and cipher
// themselves come from `sha2` and `aes`/`cbc`; this module only wires
// them together the way the OOXML container expects.

use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::NoPadding};
use sha2::{Digest, Sha512};

use vellum_core::error::{Result, VellumError};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// Password-hash iteration count written into `EncryptionInfo`.
pub const SPIN_COUNT: u32 = 100_000;

/// Ceiling on the spin count accepted from foreign `EncryptionInfo`
/// descriptors. The value is attacker-controlled and drives a CPU-bound
/// hash loop with no timeout, so an unbounded count would let one crafted
/// container pin a blocking-pool thread for hours. 10M spins is two
/// orders of magnitude above what real producers write.
pub const MAX_SPIN_COUNT: u32 = 10_000_000;

/// AES block size; also the salt/IV length this implementation writes.
pub const BLOCK_SIZE: usize = 16;

/// Package key length (AES-256).
pub const KEY_BYTES: usize = 32;

/// SHA-512 digest length, written as `hashSize`.
pub const HASH_SIZE: usize = 64;

/// `EncryptedPackage` is ciphered in segments of this many bytes, each
/// with its own derived IV.
pub const SEGMENT_SIZE: usize = 4096;

// Fixed block-key constants from MS-OFFCRYPTO §2.3.4.13.
pub const BLOCK_VERIFIER_HASH_INPUT: [u8; 8] = [0xfe, 0xa7, 0xd2, 0x76, 0x3b, 0x4b, 0x9e, 0x79];
pub const BLOCK_VERIFIER_HASH_VALUE: [u8; 8] = [0xd7, 0xaa, 0x0f, 0x6d, 0x30, 0x61, 0x34, 0x4e];
pub const BLOCK_ENCRYPTED_KEY: [u8; 8] = [0x14, 0x6e, 0x0b, 0xe7, 0xab, 0xac, 0xd0, 0xd6];

/// Iterated password hash: H_0 = SHA512(salt ‖ UTF-16LE(password)),
/// then H_i = SHA512(LE32(i) ‖ H_{i-1}) for `spin_count` rounds.
pub fn password_hash(password: &str, salt: &[u8], spin_count: u32) -> [u8; HASH_SIZE] {
    let utf16: Vec<u8> = password
        .encode_utf16()
        .flat_map(|unit| unit.to_le_bytes())
        .collect();

    let mut hasher = Sha512::new();
    hasher.update(salt);
    hasher.update(&utf16);
    let mut current: [u8; HASH_SIZE] = hasher.finalize().into();

    for i in 0..spin_count {
        let mut hasher = Sha512::new();
        hasher.update(i.to_le_bytes());
        hasher.update(current);
        current = hasher.finalize().into();
    }

    current
}

/// Derive an encryption key for one purpose: SHA512(pw_hash ‖ block_key)
/// truncated to `key_bytes`.
pub fn derive_key(pw_hash: &[u8], block_key: &[u8], key_bytes: usize) -> Vec<u8> {
    let mut hasher = Sha512::new();
    hasher.update(pw_hash);
    hasher.update(block_key);
    let digest = hasher.finalize();
    digest[..key_bytes].to_vec()
}

/// IV for package segment `index`: SHA512(key_data_salt ‖ LE32(index))
/// truncated to the block size.
pub fn segment_iv(key_data_salt: &[u8], index: u32) -> [u8; BLOCK_SIZE] {
    let mut hasher = Sha512::new();
    hasher.update(key_data_salt);
    hasher.update(index.to_le_bytes());
    let digest = hasher.finalize();
    let mut iv = [0u8; BLOCK_SIZE];
    iv.copy_from_slice(&digest[..BLOCK_SIZE]);
    iv
}

/// AES-256-CBC encrypt with zero-padding to the block size (the agile
/// format carries explicit plaintext lengths, not PKCS#7 padding).
pub fn encrypt_block(key: &[u8], iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
    let mut padded = plaintext.to_vec();
    let remainder = padded.len() % BLOCK_SIZE;
    if remainder != 0 {
        padded.resize(padded.len() + BLOCK_SIZE - remainder, 0);
    }

    let cipher = Aes256CbcEnc::new_from_slices(key, iv)
        .map_err(|err| VellumError::Internal(format!("bad AES key/IV length: {err}")))?;
    Ok(cipher.encrypt_padded_vec_mut::<NoPadding>(&padded))
}

/// AES-256-CBC decrypt. Input must be block-aligned; the caller truncates
/// to the real plaintext length afterwards.
pub fn decrypt_block(key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
    let cipher = Aes256CbcDec::new_from_slices(key, iv)
        .map_err(|err| VellumError::Internal(format!("bad AES key/IV length: {err}")))?;
    cipher
        .decrypt_padded_vec_mut::<NoPadding>(ciphertext)
        .map_err(|_| VellumError::InvalidPasswordOrCorrupted)
}

/// SHA-512 of arbitrary bytes (verifier hashing).
pub fn sha512(data: &[u8]) -> [u8; HASH_SIZE] {
    let mut hasher = Sha512::new();
    hasher.update(data);
    hasher.finalize().into()
}
