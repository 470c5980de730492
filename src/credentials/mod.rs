//! Credential storage: `data/users.bin` (spec.md §4.7).
//!
//! Rewritten in full after every successful REGISTER, under the same
//! mutex that guards the in-memory map, using the write-then-rename
//! pattern the teacher's credential file uses so a crash mid-write can
//! never leave a half-written, unparseable file behind.

use crate::error::Error;
use crate::protocol::codec::{read_utf, write_utf};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub struct CredentialStore {
    path: PathBuf,
    users: Mutex<HashMap<String, String>>,
}

impl CredentialStore {
    pub fn open(data_dir: &Path) -> Result<Self, Error> {
        let path = data_dir.join("users.bin");
        let users = load(&path)?;
        Ok(Self {
            path,
            users: Mutex::new(users),
        })
    }

    /// Returns `true` if the account was created, `false` if it already
    /// existed (the password is not changed in that case).
    pub fn register(&self, user: &str, pass: &str) -> Result<bool, Error> {
        let mut users = self.users.lock().expect("credentials lock poisoned");
        if users.contains_key(user) {
            return Ok(false);
        }
        users.insert(user.to_string(), pass.to_string());
        save(&self.path, &users)?;
        Ok(true)
    }

    pub fn verify(&self, user: &str, pass: &str) -> bool {
        let users = self.users.lock().expect("credentials lock poisoned");
        users.get(user).is_some_and(|stored| stored == pass)
    }
}

fn load(path: &Path) -> Result<HashMap<String, String>, Error> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(HashMap::new()),
        Err(e) => return Err(Error::io(path, e)),
    };
    let mut reader = BufReader::new(file);
    let n = crate::protocol::codec::read_int(&mut reader)
        .map_err(|e| Error::Protocol(format!("corrupt credentials file: {e}")))?;
    if n < 0 {
        return Err(Error::Protocol("negative credential count".into()));
    }
    let mut users = HashMap::with_capacity(n as usize);
    for _ in 0..n {
        let user = read_utf(&mut reader)?;
        let pass = read_utf(&mut reader)?;
        users.insert(user, pass);
    }
    Ok(users)
}

fn save(path: &Path, users: &HashMap<String, String>) -> Result<(), Error> {
    let tmp_path = path.with_extension("bin.tmp");
    {
        let file = File::create(&tmp_path).map_err(|e| Error::io(&tmp_path, e))?;
        let mut writer = BufWriter::new(file);
        crate::protocol::codec::write_int(&mut writer, users.len() as i32)
            .map_err(|e| Error::io(&tmp_path, e))?;
        for (user, pass) in users {
            write_utf(&mut writer, user).map_err(|e| Error::io(&tmp_path, e))?;
            write_utf(&mut writer, pass).map_err(|e| Error::io(&tmp_path, e))?;
        }
    }
    set_owner_only_permissions(&tmp_path)?;
    std::fs::rename(&tmp_path, path).map_err(|e| Error::io(path, e))
}

#[cfg(unix)]
fn set_owner_only_permissions(path: &Path) -> Result<(), Error> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| Error::io(path, e))
}

#[cfg(not(unix))]
fn set_owner_only_permissions(_path: &Path) -> Result<(), Error> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn register_then_login_matches_scenario_one() {
        let dir = tempdir().unwrap();
        let store = CredentialStore::open(dir.path()).unwrap();

        assert!(store.register("alice", "pw").unwrap());
        assert!(store.verify("alice", "pw"));
        assert!(!store.register("alice", "other").unwrap());
        assert!(!store.verify("alice", "bad"));
    }

    #[test]
    fn credentials_survive_reopen() {
        let dir = tempdir().unwrap();
        {
            let store = CredentialStore::open(dir.path()).unwrap();
            store.register("bob", "secret").unwrap();
        }
        let reopened = CredentialStore::open(dir.path()).unwrap();
        assert!(reopened.verify("bob", "secret"));
    }

    #[test]
    fn missing_file_starts_empty() {
        let dir = tempdir().unwrap();
        let store = CredentialStore::open(dir.path()).unwrap();
        assert!(!store.verify("nobody", "anything"));
    }
}
