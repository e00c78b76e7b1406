//! Storage backends for persisted wallet state
//!
//! The wallet store persists through the `KeyValueStore` seam so the backend
//! (encrypted file, in-memory, remote vault) is swappable without touching
//! store logic. The encrypted file backend keeps records under the user data
//! directory, AES-256-GCM encrypted with an Argon2-derived key.

use crate::shared::constants::ENV_WALLET_PASSWORD;
use crate::shared::error::WalletError;
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, KeyInit};
use argon2::{Argon2, PasswordHasher};
use rand_core::{OsRng, RngCore};
use std::collections::HashMap;
use std::env;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::sync::Mutex;
use zeroize::Zeroizing;

/// Key-value persistence seam for wallet state
pub trait KeyValueStore: Send + Sync {
    /// Fetch the value stored under `key`, if any
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, WalletError>;

    /// Store `value` under `key`, replacing any previous value
    fn put(&self, key: &str, value: &[u8]) -> Result<(), WalletError>;

    /// Remove the value stored under `key`; absent keys are not an error
    fn delete(&self, key: &str) -> Result<(), WalletError>;

    /// Check whether `key` holds a value
    fn exists(&self, key: &str) -> Result<bool, WalletError>;

    /// List all stored keys
    fn list(&self) -> Result<Vec<String>, WalletError>;
}

/// In-memory backend for tests and embedded use
#[derive(Default)]
pub struct MemoryStore {
    data: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, WalletError> {
        let data = self
            .data
            .lock()
            .map_err(|_| WalletError::storage("Store lock poisoned"))?;
        Ok(data.get(key).cloned())
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<(), WalletError> {
        let mut data = self
            .data
            .lock()
            .map_err(|_| WalletError::storage("Store lock poisoned"))?;
        data.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), WalletError> {
        let mut data = self
            .data
            .lock()
            .map_err(|_| WalletError::storage("Store lock poisoned"))?;
        data.remove(key);
        Ok(())
    }

    fn exists(&self, key: &str) -> Result<bool, WalletError> {
        let data = self
            .data
            .lock()
            .map_err(|_| WalletError::storage("Store lock poisoned"))?;
        Ok(data.contains_key(key))
    }

    fn list(&self) -> Result<Vec<String>, WalletError> {
        let data = self
            .data
            .lock()
            .map_err(|_| WalletError::storage("Store lock poisoned"))?;
        Ok(data.keys().cloned().collect())
    }
}

/// Encrypted file backend. One file per key plus a sidecar index mapping key
/// names to hashed filenames so keys cannot be enumerated from the directory.
pub struct EncryptedFileStore {
    base_dir: PathBuf,
}

impl EncryptedFileStore {
    /// Open the store under the OS data directory
    pub fn new() -> Result<Self, WalletError> {
        let base = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("./burner_storage"))
            .join("burner-wallet");
        Self::at(base)
    }

    /// Open the store at an explicit directory (tests)
    pub fn at(base_dir: PathBuf) -> Result<Self, WalletError> {
        fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    // Helper: Get password from env or prompt (tests are non-interactive)
    fn password() -> Result<Zeroizing<String>, WalletError> {
        if let Ok(pw) = env::var(ENV_WALLET_PASSWORD) {
            return Ok(Zeroizing::new(pw));
        }
        #[cfg(test)]
        {
            return Ok(Zeroizing::new("test_password".to_string()));
        }
        #[cfg(not(test))]
        {
            let pw = rpassword::prompt_password("Enter password for wallet storage: ")
                .map_err(|e| WalletError::storage(format!("Password prompt failed: {}", e)))?;
            Ok(Zeroizing::new(pw))
        }
    }

    // Helper: Derive encryption key from password using Argon2id
    fn derive_key(password: &str, salt: &[u8]) -> Result<Zeroizing<[u8; 32]>, WalletError> {
        let salt = argon2::password_hash::SaltString::encode_b64(salt)?;
        let argon2 = Argon2::new(
            argon2::Algorithm::Argon2id,
            argon2::Version::V0x13,
            argon2::Params::new(65536, 3, 1, Some(32))?,
        );
        let password_hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| WalletError::storage(format!("Password hashing failed: {}", e)))?;

        let hash = password_hash
            .hash
            .ok_or_else(|| WalletError::storage("Password hash is empty"))?;
        let mut key = Zeroizing::new([0u8; 32]);
        key.copy_from_slice(&hash.as_bytes()[..32]);
        Ok(key)
    }

    // Use a hash of the key for the filename to prevent key enumeration
    fn hashed_name(key: &str) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        hex::encode(&hasher.finalize()[..16])
    }

    fn data_path(&self, key: &str) -> PathBuf {
        self.base_dir.join(format!("{}.dat", Self::hashed_name(key)))
    }

    fn salt_path(&self, key: &str) -> PathBuf {
        self.base_dir.join(format!("{}.salt", Self::hashed_name(key)))
    }

    fn index_path(&self) -> PathBuf {
        self.base_dir.join("index.json")
    }

    // Helper: Get or generate salt for a key
    fn get_salt(&self, key: &str) -> Result<Zeroizing<Vec<u8>>, WalletError> {
        let path = self.salt_path(key);
        if path.exists() {
            let mut salt = Zeroizing::new(vec![]);
            File::open(&path)?.read_to_end(&mut salt)?;
            Ok(salt)
        } else {
            let mut salt = Zeroizing::new([0u8; 32]);
            OsRng.fill_bytes(&mut *salt);
            let mut f = File::create(&path)?;
            f.set_permissions(fs::Permissions::from_mode(0o600))?;
            f.write_all(&*salt)?;
            Ok(Zeroizing::new(salt.to_vec()))
        }
    }

    fn read_index(&self) -> Result<HashMap<String, String>, WalletError> {
        let path = self.index_path();
        if !path.exists() {
            return Ok(HashMap::new());
        }
        let mut raw = vec![];
        File::open(&path)?.read_to_end(&mut raw)?;
        Ok(serde_json::from_slice(&raw)?)
    }

    fn write_index(&self, index: &HashMap<String, String>) -> Result<(), WalletError> {
        let raw = serde_json::to_vec(index)?;
        let mut f = File::create(self.index_path())?;
        f.set_permissions(fs::Permissions::from_mode(0o600))?;
        f.write_all(&raw)?;
        Ok(())
    }
}

impl KeyValueStore for EncryptedFileStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, WalletError> {
        let path = self.data_path(key);
        if !path.exists() {
            return Ok(None);
        }

        let password = Self::password()?;
        let salt = self.get_salt(key)?;
        let key_bytes = Self::derive_key(&password, &salt)?;
        let cipher = Aes256Gcm::new(GenericArray::from_slice(&*key_bytes));

        let mut file = File::open(&path)?;
        let mut nonce = [0u8; 12];
        file.read_exact(&mut nonce)?;
        let mut ciphertext = vec![];
        file.read_to_end(&mut ciphertext)?;

        let plaintext = cipher
            .decrypt(GenericArray::from_slice(&nonce), ciphertext.as_slice())
            .map_err(|e| WalletError::storage(format!("Decryption failed: {}", e)))?;
        Ok(Some(plaintext))
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<(), WalletError> {
        let password = Self::password()?;
        let salt = self.get_salt(key)?;
        let key_bytes = Self::derive_key(&password, &salt)?;
        let cipher = Aes256Gcm::new(GenericArray::from_slice(&*key_bytes));

        let mut nonce = [0u8; 12];
        OsRng.fill_bytes(&mut nonce);
        let ciphertext = cipher
            .encrypt(GenericArray::from_slice(&nonce), value)
            .map_err(|e| WalletError::storage(format!("Encryption failed: {}", e)))?;

        let mut file = File::create(self.data_path(key))?;
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
        file.write_all(&nonce)?;
        file.write_all(&ciphertext)?;

        let mut index = self.read_index()?;
        index.insert(key.to_string(), Self::hashed_name(key));
        self.write_index(&index)
    }

    fn delete(&self, key: &str) -> Result<(), WalletError> {
        let _ = fs::remove_file(self.data_path(key));
        let _ = fs::remove_file(self.salt_path(key));
        let mut index = self.read_index()?;
        index.remove(key);
        self.write_index(&index)
    }

    fn exists(&self, key: &str) -> Result<bool, WalletError> {
        Ok(self.data_path(key).exists())
    }

    fn list(&self) -> Result<Vec<String>, WalletError> {
        Ok(self.read_index()?.into_keys().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryStore::new();
        store.put("k", b"value").expect("Failed to put value");
        assert_eq!(
            store.get("k").expect("Failed to get value"),
            Some(b"value".to_vec())
        );
        assert!(store.exists("k").expect("Failed to check key"));

        store.delete("k").expect("Failed to delete value");
        assert_eq!(store.get("k").expect("Failed to get value"), None);
    }

    #[test]
    fn test_encrypted_file_store_round_trip() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let store =
            EncryptedFileStore::at(dir.path().to_path_buf()).expect("Failed to open store");

        store.put("wallets", b"[1,2,3]").expect("Failed to put value");
        assert_eq!(
            store.get("wallets").expect("Failed to get value"),
            Some(b"[1,2,3]".to_vec())
        );
        assert_eq!(store.list().expect("Failed to list keys"), vec!["wallets"]);

        // Ciphertext on disk, not plaintext
        let data_file = store.data_path("wallets");
        let raw = fs::read(data_file).expect("Failed to read data file");
        assert!(!raw.windows(7).any(|w| w == b"[1,2,3]"));

        store.delete("wallets").expect("Failed to delete value");
        assert_eq!(store.get("wallets").expect("Failed to get value"), None);
        assert!(store.list().expect("Failed to list keys").is_empty());
    }

    #[test]
    fn test_missing_key_is_none_not_error() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let store =
            EncryptedFileStore::at(dir.path().to_path_buf()).expect("Failed to open store");
        assert_eq!(store.get("absent").expect("Failed to get value"), None);
        assert!(!store.exists("absent").expect("Failed to check key"));
    }
}
