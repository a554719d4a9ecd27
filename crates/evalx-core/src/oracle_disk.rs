use crate::error::EvalError;
use crate::oracle::OracleCache;
use crate::types::OracleMap;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

const ORACLE_FORMAT: &str = "evalx-oracle-v1";

#[derive(Serialize)]
struct OracleFileRef<'a> {
    format: &'a str,
    key: &'a str,
    oracles: &'a OracleMap,
}

#[derive(Deserialize)]
struct OracleFile {
    format: String,
    key: String,
    oracles: OracleMap,
}

/// Content-addressed oracle store: one gzip-compressed file per problem-set hash.
#[derive(Debug, Clone)]
pub struct DiskOracleCache {
    dir: PathBuf,
}

impl DiskOracleCache {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.oracle.gz"))
    }
}

impl OracleCache for DiskOracleCache {
    fn get(&self, key: &str) -> Result<Option<OracleMap>, EvalError> {
        let path = self.path_for(key);
        let file = match fs::File::open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(EvalError::io(&path, err)),
        };

        let decoded: OracleFile = serde_json::from_reader(GzDecoder::new(file))
            .map_err(|err| EvalError::format(format!("{}: {err}", path.display())))?;
        if decoded.format != ORACLE_FORMAT {
            return Err(EvalError::format(format!(
                "{}: unsupported oracle format {}",
                path.display(),
                decoded.format
            )));
        }
        if decoded.key != key {
            return Err(EvalError::format(format!(
                "{}: oracle file records key {}",
                path.display(),
                decoded.key
            )));
        }
        Ok(Some(decoded.oracles))
    }

    fn put(&self, key: &str, oracles: &OracleMap) -> Result<(), EvalError> {
        fs::create_dir_all(&self.dir).map_err(|err| EvalError::io(&self.dir, err))?;
        let path = self.path_for(key);
        let tmp_path = path.with_extension("gz.tmp");

        let payload = OracleFileRef {
            format: ORACLE_FORMAT,
            key,
            oracles,
        };
        write_compressed(&tmp_path, &payload).map_err(|err| {
            let _ = fs::remove_file(&tmp_path);
            err
        })?;
        fs::rename(&tmp_path, &path).map_err(|err| {
            let _ = fs::remove_file(&tmp_path);
            EvalError::io(&path, err)
        })
    }
}

fn write_compressed(path: &Path, payload: &OracleFileRef<'_>) -> Result<(), EvalError> {
    let file = fs::File::create(path).map_err(|err| EvalError::io(path, err))?;
    let mut encoder = GzEncoder::new(file, Compression::default());
    serde_json::to_writer(&mut encoder, payload)
        .map_err(|err| EvalError::format(format!("{}: {err}", path.display())))?;
    let mut file = encoder.finish().map_err(|err| EvalError::io(path, err))?;
    file.flush().map_err(|err| EvalError::io(path, err))
}
