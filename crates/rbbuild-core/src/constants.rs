//! Constants used across the rbbuild workspace.

/// The filename for rbbuild's optional project configuration.
pub const CONFIG_FILE: &str = "rbbuild.toml";

/// Top-level directories below the root, one subdirectory per target.
pub const SRC_DIR: &str = "src";
pub const BUILD_DIR: &str = "build";
pub const INSTALL_DIR: &str = "install";

/// Generated by autoconf inside the source tree.
pub const CONFIGURE_SCRIPT: &str = "configure";

/// Generated by configure inside the build tree.
pub const MAKEFILE: &str = "Makefile";
