mod common;

use bootshim_api::{Accessor, EntryContext, Relation, TargetError};
use bootshim_core::entry::{self, EntryPoints};
use bootshim_core::error::{EntryError, GraphError, VisibilityError};
use bootshim_core::installer::InstallOutcome;
use bootshim_core::{Bootstrap, BootstrapError, CapabilityGrantor, LaunchError};
use common::{MAIN_CLASS, VERSION, config, server_layout, write};
use std::fmt;
use std::sync::{Arc, Mutex};
use tempfile::tempdir;

#[derive(Debug)]
struct ServerStopped {
    reason: &'static str,
}

impl fmt::Display for ServerStopped {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "server stopped: {}", self.reason)
    }
}

impl std::error::Error for ServerStopped {}

type Seen = Arc<Mutex<Option<EntryContext>>>;

fn recording_entries() -> (EntryPoints, Seen) {
    let seen: Seen = Arc::default();
    let recorder = Arc::clone(&seen);
    let mut entries = EntryPoints::new();
    entries.register(MAIN_CLASS, move |ctx: EntryContext| -> Result<(), TargetError> {
        *recorder.lock().unwrap() = Some(ctx);
        Ok(())
    });
    (entries, seen)
}

#[test]
fn test_end_to_end_launch() {
    let dir = tempdir().unwrap();
    server_layout(dir.path(), VERSION);
    let (entries, seen) = recording_entries();
    let mut bootstrap = Bootstrap::new(config(dir.path()), entries);

    bootstrap.run(vec!["nogui".to_string()]).unwrap();

    let ctx = seen.lock().unwrap().take().expect("entry point was invoked");
    assert_eq!(ctx.args, vec!["--launchTarget", "forgeserver", "nogui"]);
    assert_eq!(ctx.property("java.net.preferIPv6Addresses"), Some("system"));
    assert_eq!(ctx.property("libraryDirectory"), Some("libraries"));
    assert!(ctx.property("jdk.module.path").unwrap().contains("loader-4.0.jar"));
    assert_eq!(ctx.working_dir, dir.path());
}

#[test]
fn test_plan_reflects_every_phase() {
    let dir = tempdir().unwrap();
    server_layout(dir.path(), VERSION);
    let (entries, seen) = recording_entries();
    let mut bootstrap = Bootstrap::new(config(dir.path()), entries);

    let prepared = bootstrap.prepare(vec![]).unwrap();
    let plan = &prepared.plan;

    assert_eq!(plan.install, InstallOutcome::Present);
    assert_eq!(plan.installed_version.as_deref(), Some(VERSION));
    assert_eq!(plan.argument_files.len(), 2);
    assert_eq!(plan.module_path.len(), 2);
    let names: Vec<&str> = plan.components.iter().map(|c| c.name()).collect();
    assert_eq!(names, vec!["cpw.mods.securejarhandler", "loader"]);
    assert_eq!(plan.entry_point, MAIN_CLASS);
    assert_eq!(plan.entry_component, "loader");
    assert_eq!(plan.arguments, vec!["--launchTarget", "forgeserver"]);

    // one open, one export; the absent export target is skipped
    assert_eq!(plan.relaxations.len(), 2);
    assert!(plan.relaxations.iter().any(|r| r.relation == Relation::Open
        && r.component == "java.base"
        && r.package == "java.util.jar"
        && r.accessor == Accessor::named("cpw.mods.securejarhandler")));

    // nothing was delegated
    assert!(seen.lock().unwrap().is_none());
    let json = serde_json::to_value(plan).unwrap();
    assert_eq!(json["install"]["outcome"], "present");
}

#[test]
fn test_entry_resolution_sees_only_the_new_layer() {
    let dir = tempdir().unwrap();
    server_layout(dir.path(), VERSION);
    let (entries, _) = recording_entries();
    let mut bootstrap = Bootstrap::new(config(dir.path()), entries.clone());

    let before = bootstrap.root().current();
    let err = entry::resolve(&entries, MAIN_CLASS, &before, CapabilityGrantor::attach()).unwrap_err();
    assert!(matches!(err, EntryError::Unowned { .. }));
    assert_eq!(bootstrap.root().generation(), 0);

    bootstrap.prepare(vec![]).unwrap();

    let after = bootstrap.root().current();
    assert_eq!(bootstrap.root().generation(), 1);
    assert!(Arc::ptr_eq(after.parent().unwrap(), &before));
    assert!(bootstrap.root().loader().is_registered("loader"));
    let resolved = entry::resolve(&entries, MAIN_CLASS, &after, CapabilityGrantor::attach()).unwrap();
    assert_eq!(resolved.component, "loader");
    // the old layer is untouched by the swap
    assert!(before.find_component("loader").is_none());
}

#[test]
fn test_target_error_is_propagated_verbatim() {
    let dir = tempdir().unwrap();
    server_layout(dir.path(), VERSION);
    let mut entries = EntryPoints::new();
    entries.register(MAIN_CLASS, |_ctx: EntryContext| -> Result<(), TargetError> {
        Err(Box::new(ServerStopped { reason: "eula not accepted" }))
    });
    let mut bootstrap = Bootstrap::new(config(dir.path()), entries);

    match bootstrap.run(vec![]).unwrap_err() {
        LaunchError::Target(err) => {
            let stopped = err.downcast_ref::<ServerStopped>().expect("original error type");
            assert_eq!(stopped.reason, "eula not accepted");
        }
        LaunchError::Bootstrap(err) => panic!("unexpected bootstrap failure: {err}"),
    }
}

#[test]
fn test_missing_module_path() {
    let dir = tempdir().unwrap();
    write(dir.path(), "run.sh", "java @args.txt \"$@\"\n");
    write(dir.path(), "args.txt", "-Dfoo=bar\nnet.neoforged.fml.startup.Server\n");
    let (entries, _) = recording_entries();
    let mut bootstrap = Bootstrap::new(config(dir.path()), entries);

    let err = bootstrap.prepare(vec![]).unwrap_err();
    assert!(matches!(err, BootstrapError::MissingModulePath { .. }));
    assert_eq!(err.exit_code(), 1);
    assert!(err.to_string().starts_with("Could not find module path (specified by -p)"));
}

#[test]
fn test_unknown_relaxation_source_leaves_root_untouched() {
    let dir = tempdir().unwrap();
    server_layout(dir.path(), VERSION);
    write(
        dir.path(),
        &format!("libraries/net/neoforged/neoforge/{VERSION}/unix_args.txt"),
        "-p libraries/net/neoforged/fancymodloader/loader-4.0.jar\n\
         --add-opens no.such.component/a.b=loader\n\
         net.neoforged.fml.startup.Server\n",
    );
    let (entries, _) = recording_entries();
    let mut bootstrap = Bootstrap::new(config(dir.path()), entries);

    let err = bootstrap.prepare(vec![]).unwrap_err();
    assert!(matches!(
        err,
        BootstrapError::Visibility(VisibilityError::UnknownComponent { .. })
    ));
    assert_eq!(bootstrap.root().generation(), 0);
    assert!(!bootstrap.root().loader().is_registered("loader"));
}

#[test]
fn test_duplicate_components_in_one_directory() {
    let dir = tempdir().unwrap();
    server_layout(dir.path(), VERSION);
    let libs = dir.path().join("mods");
    for name in ["loader-4.0.jar", "loader-4.1.jar"] {
        common::jar(
            &libs.join(name),
            &[("net/neoforged/fml/startup/Server.class", b"\xca\xfe\xba\xbe".as_slice())],
        );
    }
    write(
        dir.path(),
        &format!("libraries/net/neoforged/neoforge/{VERSION}/unix_args.txt"),
        "-p mods\nnet.neoforged.fml.startup.Server\n",
    );
    let (entries, _) = recording_entries();
    let mut bootstrap = Bootstrap::new(config(dir.path()), entries);

    let err = bootstrap.prepare(vec![]).unwrap_err();
    assert!(matches!(
        err,
        BootstrapError::Graph(GraphError::Duplicate { ref name, .. }) if name == "loader"
    ));
}

#[test]
fn test_unregistered_entry_point() {
    let dir = tempdir().unwrap();
    server_layout(dir.path(), VERSION);
    let mut bootstrap = Bootstrap::new(config(dir.path()), EntryPoints::new());

    let err = bootstrap.run(vec![]).unwrap_err();
    assert_eq!(
        err.to_string(),
        format!("Failed to find main class \"{MAIN_CLASS}\"")
    );
    assert!(matches!(err, LaunchError::Bootstrap(BootstrapError::Entry(_))));
}

#[test]
fn test_module_path_alias_and_class_path() {
    let dir = tempdir().unwrap();
    server_layout(dir.path(), VERSION);
    write(
        dir.path(),
        &format!("libraries/net/neoforged/neoforge/{VERSION}/unix_args.txt"),
        "--module-path libraries/net/neoforged/fancymodloader/loader-4.0.jar\n\
         -cp libraries/extra.jar\n\
         -Dempty\n\
         net.neoforged.fml.startup.Server\n",
    );
    let (entries, _) = recording_entries();
    let mut bootstrap = Bootstrap::new(config(dir.path()), entries);

    let plan = bootstrap.prepare(vec![]).unwrap().plan;
    assert_eq!(plan.properties.get("java.class.path").map(String::as_str), Some("libraries/extra.jar"));
    assert_eq!(plan.properties.get("empty").map(String::as_str), Some(""));
    assert!(plan.arguments.is_empty());
}
