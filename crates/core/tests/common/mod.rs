use bootshim_api::{EntryContext, Platform, TargetError};
use bootshim_core::BootstrapConfig;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;

pub const VERSION: &str = "21.1.145";
pub const MAIN_CLASS: &str = "net.neoforged.fml.startup.Server";
pub const INSTALLER_MAIN: &str = "net.neoforged.installer.SimpleInstaller";

#[allow(dead_code)]
pub fn write(dir: &Path, relative: &str, contents: &str) -> PathBuf {
    let path = dir.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, contents).unwrap();
    path
}

/// Writes a zip archive with the given entries.
#[allow(dead_code)]
pub fn jar(path: &Path, entries: &[(&str, &[u8])]) -> PathBuf {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let mut writer = zip::ZipWriter::new(File::create(path).unwrap());
    for (name, contents) in entries {
        writer.start_file(*name, SimpleFileOptions::default()).unwrap();
        writer.write_all(contents).unwrap();
    }
    writer.finish().unwrap();
    path.to_path_buf()
}

fn run_script(version: &str) -> String {
    format!(
        "#!/usr/bin/env sh\n\
         # Add custom JVM arguments to the user_jvm_args.txt\n\
         java @user_jvm_args.txt @libraries/net/neoforged/neoforge/{version}/unix_args.txt \"$@\"\n"
    )
}

/// The files an installer generates for `version`: launch script, argument
/// files and the two libraries on the module path.
#[allow(dead_code)]
pub fn server_layout(dir: &Path, version: &str) {
    write(dir, "run.sh", &run_script(version));
    write(
        dir,
        "user_jvm_args.txt",
        "# Xmx and Xms set the maximum and minimum RAM usage, respectively.\n-Xmx4G\n",
    );
    write(
        dir,
        &format!("libraries/net/neoforged/neoforge/{version}/unix_args.txt"),
        "-p libraries/cpw/mods/securejarhandler/3.0.8/securejarhandler-3.0.8.jar:libraries/net/neoforged/fancymodloader/loader-4.0.jar\n\
         --add-modules ALL-MODULE-PATH\n\
         --add-opens java.base/java.util.jar=cpw.mods.securejarhandler\n\
         --add-exports java.base/sun.security.util=cpw.mods.securejarhandler,absent.component\n\
         -Djava.net.preferIPv6Addresses=system\n\
         -DlibraryDirectory=libraries\n\
         net.neoforged.fml.startup.Server\n\
         --launchTarget forgeserver\n",
    );
    jar(
        &dir.join("libraries/cpw/mods/securejarhandler/3.0.8/securejarhandler-3.0.8.jar"),
        &[
            (
                "META-INF/MANIFEST.MF",
                b"Manifest-Version: 1.0\nAutomatic-Module-Name: cpw.mods.securejarhandler\n".as_slice(),
            ),
            ("cpw/mods/jarhandling/SecureJar.class", b"\xca\xfe\xba\xbe".as_slice()),
        ],
    );
    jar(
        &dir.join("libraries/net/neoforged/fancymodloader/loader-4.0.jar"),
        &[
            ("META-INF/MANIFEST.MF", b"Manifest-Version: 1.0\n".as_slice()),
            ("net/neoforged/fml/startup/Server.class", b"\xca\xfe\xba\xbe".as_slice()),
        ],
    );
}

/// An installer package whose embedded script points at `version`.
#[allow(dead_code)]
pub fn installer_package(dir: &Path, version: &str) -> PathBuf {
    let manifest = format!("Manifest-Version: 1.0\nMain-Class: {INSTALLER_MAIN}\n");
    let script = run_script(version);
    jar(
        &dir.join(format!("neoforge-{version}-installer.jar")),
        &[
            ("META-INF/MANIFEST.MF", manifest.as_bytes()),
            ("data/run.sh", script.as_bytes()),
        ],
    )
}

/// Installer entry point that lays out `version` and then exits the way
/// real installers do.
#[allow(dead_code)]
pub fn installing(version: &'static str) -> impl Fn(EntryContext) -> Result<(), TargetError> + Send + Sync {
    move |ctx: EntryContext| -> Result<(), TargetError> {
        assert_eq!(ctx.args, vec!["--installServer"]);
        server_layout(&ctx.working_dir, version);
        match bootshim_core::exit(0)? {}
    }
}

#[allow(dead_code)]
pub fn config(dir: &Path) -> BootstrapConfig {
    BootstrapConfig {
        base_dir: dir.to_path_buf(),
        platform: Some(Platform::Unix),
        ..BootstrapConfig::default()
    }
}
