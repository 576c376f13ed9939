//! Alignment and signing stage.
//!
//! The keystore generated here is a debug key with a fixed, public password.
//! It exists so the APK installs on a device; it must never be used to sign
//! anything that is distributed.

use std::path::PathBuf;

use tracing::info;

use super::common::BuildContext;
use super::package::UnsignedPackage;
use crate::types::{ApkError, Tool};

/// Keystore file name inside the output directory.
pub const DEBUG_KEYSTORE: &str = "debug.keystore";
const KEY_ALIAS: &str = "androiddebugkey";
const KEY_PASSWORD: &str = "android";
const KEY_DNAME: &str = "CN=Android Debug,O=Android,C=US";
/// zipalign boundary in bytes.
const ALIGNMENT: &str = "4";

/// Aligns `unsigned` into `bin/<Project>.apk`, creating the debug keystore
/// on first use, and signs the aligned APK in place.
///
/// The unaligned APK is kept on disk.
pub fn align_and_sign(ctx: &BuildContext<'_>, unsigned: &UnsignedPackage) -> Result<PathBuf, ApkError> {
    let out = ctx.out_dir();
    let apk_name = format!("{}.apk", ctx.config.project_name);
    let aligned_arg = ["bin", apk_name.as_str()].iter().collect::<PathBuf>();
    let aligned = out.join(&aligned_arg);

    info!("aligning {}", aligned.display());
    ctx.run(
        ctx.invocation(Tool::Zipalign)
            .args(["-f", "-v", ALIGNMENT])
            .arg(&unsigned.apk)
            .arg(&aligned_arg),
    )?;

    ensure_debug_keystore(ctx)?;

    info!("signing {}", aligned.display());
    ctx.run(
        ctx.invocation(Tool::Apksigner)
            .arg("sign")
            .arg("--min-sdk-version")
            .arg(&ctx.config.min_api_level)
            .args(["--ks", DEBUG_KEYSTORE])
            .arg("--ks-pass")
            .arg(format!("pass:{}", KEY_PASSWORD))
            .arg("--key-pass")
            .arg(format!("pass:{}", KEY_PASSWORD))
            .arg(&aligned_arg),
    )?;

    Ok(aligned)
}

/// Generates `<out>/debug.keystore` unless it already exists.
///
/// Returns `true` when a new keystore was generated.
pub fn ensure_debug_keystore(ctx: &BuildContext<'_>) -> Result<bool, ApkError> {
    let keystore = ctx.out_dir().join(DEBUG_KEYSTORE);
    if keystore.is_file() {
        return Ok(false);
    }

    info!("generating debug keystore at {}", keystore.display());
    ctx.run(
        ctx.invocation(Tool::Keytool)
            .args(["-genkey", "-v", "-keystore", DEBUG_KEYSTORE])
            .args(["-storepass", KEY_PASSWORD, "-alias", KEY_ALIAS])
            .args(["-keypass", KEY_PASSWORD])
            .args(["-keyalg", "RSA", "-keysize", "2048", "-noprompt"])
            .args(["-dname", KEY_DNAME]),
    )?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::testing::{FakeRunner, Fixture};
    use std::fs;

    fn unsigned_in(out: &std::path::Path) -> UnsignedPackage {
        let apk = out.join("bin/app.unaligned.apk");
        fs::write(&apk, b"PK\x03\x04").unwrap();
        UnsignedPackage {
            apk,
            native_libraries: vec![],
        }
    }

    #[test]
    fn aligns_generates_key_and_signs() {
        let fx = Fixture::new();
        let prepared = fx.prepare();
        let runner = FakeRunner::new();
        let unsigned = unsigned_in(&fx.out_dir());

        let apk = align_and_sign(&prepared.ctx(&runner), &unsigned).unwrap();

        assert_eq!(apk, fx.out_dir().join("bin/app.apk"));
        assert!(apk.is_file());
        assert!(unsigned.apk.is_file());
        assert!(fx.out_dir().join(DEBUG_KEYSTORE).is_file());
        assert_eq!(
            runner.tools(),
            vec![Tool::Zipalign, Tool::Keytool, Tool::Apksigner]
        );

        let calls = runner.calls();
        let align = calls[0].args_lossy();
        assert!(align.contains(&"4".to_string()));
        let keytool = calls[1].args_lossy();
        assert!(keytool.contains(&"CN=Android Debug,O=Android,C=US".to_string()));
        let sign = calls[2].args_lossy();
        assert_eq!(&sign[..3], ["sign", "--min-sdk-version", "21"]);
        assert!(sign.contains(&"pass:android".to_string()));
    }

    #[test]
    fn existing_keystore_is_not_regenerated() {
        let fx = Fixture::new();
        let prepared = fx.prepare();
        let runner = FakeRunner::new();
        let ctx = prepared.ctx(&runner);

        assert!(ensure_debug_keystore(&ctx).unwrap());
        let keystore = fx.out_dir().join(DEBUG_KEYSTORE);
        let modified = fs::metadata(&keystore).unwrap().modified().unwrap();

        let unsigned = unsigned_in(&fx.out_dir());
        align_and_sign(&ctx, &unsigned).unwrap();
        align_and_sign(&ctx, &unsigned).unwrap();

        assert!(!ensure_debug_keystore(&ctx).unwrap());
        assert_eq!(fs::metadata(&keystore).unwrap().modified().unwrap(), modified);
        let keytool_runs = runner.tools().iter().filter(|t| **t == Tool::Keytool).count();
        assert_eq!(keytool_runs, 1);
    }
}
