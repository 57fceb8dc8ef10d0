//! Components provided by the runtime image itself.

use bootshim_api::{BOOTSTRAP_COMPONENT, ComponentDescriptor, ComponentKind, ComponentRef};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Platform components every launch can rely on.
pub const RUNTIME_IMAGE_COMPONENTS: &[&str] = &[
    "java.base",
    "java.compiler",
    "java.datatransfer",
    "java.desktop",
    "java.instrument",
    "java.logging",
    "java.management",
    "java.management.rmi",
    "java.naming",
    "java.net.http",
    "java.prefs",
    "java.rmi",
    "java.scripting",
    "java.se",
    "java.security.jgss",
    "java.security.sasl",
    "java.smartcardio",
    "java.sql",
    "java.sql.rowset",
    "java.transaction.xa",
    "java.xml",
    "java.xml.crypto",
    "jdk.accessibility",
    "jdk.attach",
    "jdk.charsets",
    "jdk.compiler",
    "jdk.crypto.cryptoki",
    "jdk.crypto.ec",
    "jdk.dynalink",
    "jdk.httpserver",
    "jdk.incubator.vector",
    "jdk.internal.vm.ci",
    "jdk.jartool",
    "jdk.jdi",
    "jdk.jfr",
    "jdk.jsobject",
    "jdk.localedata",
    "jdk.management",
    "jdk.management.agent",
    "jdk.management.jfr",
    "jdk.naming.dns",
    "jdk.net",
    "jdk.nio.mapmode",
    "jdk.random",
    "jdk.sctp",
    "jdk.security.auth",
    "jdk.security.jgss",
    "jdk.unsupported",
    "jdk.xml.dom",
    "jdk.zipfs",
];

const IMAGE_LOCATION: &str = "jrt:/";

fn platform_component(name: &str) -> ComponentRef {
    let descriptor = ComponentDescriptor {
        name: name.to_string(),
        kind: ComponentKind::Explicit,
        open: false,
        requires: Vec::new(),
        exports: Vec::new(),
        opens: Vec::new(),
        packages: BTreeSet::new(),
    };
    ComponentRef::new(descriptor, PathBuf::from(IMAGE_LOCATION).join(name))
}

/// Components of the boot layer: the runtime image plus the bootstrap itself.
pub fn boot_components() -> Vec<ComponentRef> {
    let mut components: Vec<ComponentRef> = RUNTIME_IMAGE_COMPONENTS
        .iter()
        .map(|name| platform_component(name))
        .collect();
    let location = std::env::current_exe().unwrap_or_else(|_| PathBuf::from(BOOTSTRAP_COMPONENT));
    components.push(ComponentRef::new(
        ComponentDescriptor::automatic(BOOTSTRAP_COMPONENT, BTreeSet::new()),
        location,
    ));
    components
}
