//! Model signing utility for Heartcheck classifier exports.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin sign_model -- keygen --out-seed <path> [--force]
//! cargo run --bin sign_model -- sign <model_file> [--key <seed_file>]
//! ```
//!
//! `keygen` writes a base64 Ed25519 seed (0600 on Unix) and prints the public
//! key to export as `HEARTCHECK_MODEL_PUBKEY_B64`.
//!
//! `sign` writes `manifest.json` and `model.sig` next to the model file. The
//! seed comes from `--key`, then `HEARTCHECK_MODEL_SIGNING_KEY_B64_FILE`, then
//! (debug builds only) `HEARTCHECK_MODEL_SIGNING_KEY_B64`.

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::io::Write;
#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use base64::engine::general_purpose;
use base64::Engine;
use ed25519_dalek::{Signature, Signer, SigningKey};
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use heartcheck::adapters::signature::{
    sha256_hex, unix_now, ModelManifest, MANIFEST_FILE, MANIFEST_VERSION, SIGNATURE_FILE,
};

const USAGE: &str = "Usage:\n  sign_model keygen --out-seed <path> [--force]\n  sign_model sign <model_file> [--key <seed_file>]";

#[derive(Zeroize, ZeroizeOnDrop)]
struct Seed([u8; 32]);

enum Command {
    Keygen { out_seed: PathBuf, force: bool },
    Sign { model: PathBuf, key: Option<PathBuf> },
}

fn parse_args() -> Result<Command> {
    let mut args = env::args().skip(1);
    let sub = args.next().ok_or_else(|| anyhow!(USAGE))?;

    match sub.as_str() {
        "keygen" => {
            let mut out_seed = None;
            let mut force = false;
            while let Some(arg) = args.next() {
                match arg.as_str() {
                    "--out-seed" => {
                        out_seed = Some(PathBuf::from(args.next().ok_or_else(|| anyhow!(USAGE))?))
                    }
                    "--force" => force = true,
                    _ => bail!("Unknown argument: {arg}\n{USAGE}"),
                }
            }
            Ok(Command::Keygen {
                out_seed: out_seed.ok_or_else(|| anyhow!(USAGE))?,
                force,
            })
        }
        "sign" => {
            let mut model = None;
            let mut key = None;
            while let Some(arg) = args.next() {
                match arg.as_str() {
                    "--key" => key = Some(PathBuf::from(args.next().ok_or_else(|| anyhow!(USAGE))?)),
                    _ if model.is_none() => model = Some(PathBuf::from(arg)),
                    _ => bail!("Unexpected argument: {arg}\n{USAGE}"),
                }
            }
            Ok(Command::Sign {
                model: model.ok_or_else(|| anyhow!(USAGE))?,
                key,
            })
        }
        _ => bail!(USAGE),
    }
}

fn keygen(out_seed: &Path, force: bool) -> Result<()> {
    if out_seed.exists() && !force {
        bail!("Refusing to overwrite existing file {out_seed:?}. Use --force.");
    }

    let mut seed = Seed([0u8; 32]);
    OsRng.fill_bytes(&mut seed.0);
    let signing_key = SigningKey::from_bytes(&seed.0);
    let seed_b64 = Zeroizing::new(general_purpose::STANDARD.encode(seed.0));
    let pub_b64 = general_purpose::STANDARD.encode(signing_key.verifying_key().as_bytes());

    if let Some(parent) = out_seed.parent() {
        let _ = fs::create_dir_all(parent);
    }

    let mut opts = fs::OpenOptions::new();
    opts.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        opts.mode(0o600);
    }
    let mut file = opts
        .open(out_seed)
        .with_context(|| format!("Failed to open {out_seed:?}"))?;
    file.write_all(seed_b64.as_bytes())?;
    file.write_all(b"\n")?;

    // Print only non-secret material.
    println!("Wrote signing seed (base64) to {out_seed:?}");
    println!("HEARTCHECK_MODEL_PUBKEY_B64={pub_b64}");
    Ok(())
}

fn read_seed_b64(key: Option<&Path>) -> Result<Zeroizing<String>> {
    let from_file = |path: &Path| -> Result<Zeroizing<String>> {
        let content = Zeroizing::new(
            fs::read_to_string(path).with_context(|| format!("Failed reading signing key {path:?}"))?,
        );
        Ok(Zeroizing::new(content.trim().to_string()))
    };

    let secret = if let Some(path) = key {
        from_file(path)?
    } else if let Ok(path) = env::var("HEARTCHECK_MODEL_SIGNING_KEY_B64_FILE") {
        from_file(Path::new(path.trim()))?
    } else if cfg!(debug_assertions) {
        // Dev-only fallback for convenience.
        let v = env::var("HEARTCHECK_MODEL_SIGNING_KEY_B64").map_err(|_| {
            anyhow!("Missing signing key. Pass --key or set HEARTCHECK_MODEL_SIGNING_KEY_B64_FILE.")
        })?;
        Zeroizing::new(v.trim().to_string())
    } else {
        bail!("Missing signing key. Pass --key or set HEARTCHECK_MODEL_SIGNING_KEY_B64_FILE.");
    };

    if secret.is_empty() {
        bail!("Empty signing key");
    }
    Ok(secret)
}

fn read_seed(key: Option<&Path>) -> Result<Seed> {
    let b64 = read_seed_b64(key)?;
    let raw = Zeroizing::new(
        general_purpose::STANDARD
            .decode(b64.as_bytes())
            .context("Invalid base64 in signing key")?,
    );
    let bytes: [u8; 32] = raw.as_slice().try_into().map_err(|_| {
        anyhow!(
            "Signing key seed must be 32 bytes after base64 decode (got {})",
            raw.len()
        )
    })?;
    Ok(Seed(bytes))
}

fn sign(model: &Path, key: Option<&Path>) -> Result<()> {
    let file_name = model
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow!("Model path has no file name: {model:?}"))?;
    let model_dir = model.parent().unwrap_or_else(|| Path::new("."));
    let model_bytes = fs::read(model).with_context(|| format!("Failed to read {model:?}"))?;

    let seed = read_seed(key)?;
    let signing_key = SigningKey::from_bytes(&seed.0);

    let mut nonce = [0u8; 16];
    OsRng.fill_bytes(&mut nonce);

    let manifest = ModelManifest {
        version: MANIFEST_VERSION,
        created_at: unix_now(),
        nonce_b64: general_purpose::STANDARD.encode(nonce),
        files: BTreeMap::from([(file_name.to_string(), sha256_hex(&model_bytes))]),
    };
    let manifest_bytes =
        serde_json::to_vec_pretty(&manifest).context("Failed to serialize manifest")?;

    let manifest_path = model_dir.join(MANIFEST_FILE);
    fs::write(&manifest_path, &manifest_bytes)
        .with_context(|| format!("Failed to write {manifest_path:?}"))?;

    let sig: Signature = signing_key.sign(&manifest_bytes);
    let sig_path = model_dir.join(SIGNATURE_FILE);
    fs::write(&sig_path, sig.to_bytes()).with_context(|| format!("Failed to write {sig_path:?}"))?;

    println!("Signed manifest: {manifest_path:?}");
    println!("Wrote signature: {sig_path:?}");
    println!(
        "HEARTCHECK_MODEL_PUBKEY_B64={}",
        general_purpose::STANDARD.encode(signing_key.verifying_key().as_bytes())
    );
    Ok(())
}

fn main() -> Result<()> {
    match parse_args()? {
        Command::Keygen { out_seed, force } => keygen(&out_seed, force),
        Command::Sign { model, key } => sign(&model, key.as_deref()),
    }
}
