/// Map the host OS to the keyword used in upstream clangd asset names.
pub fn platform_keyword(os: &str) -> Option<&'static str> {
    match os {
        "windows" => Some("windows"),
        "linux" => Some("linux"),
        "macos" => Some("mac"),
        _ => None,
    }
}

/// Whether the released asset for `keyword` can run on this architecture.
///
/// Upstream publishes one asset per OS. The Windows build is 32-bit but runs
/// under any 64-bit editor, and the mac build is a universal binary, so both
/// are accepted more broadly than the Linux one.
pub fn arch_compatible(keyword: &str, arch: &str) -> bool {
    match keyword {
        "windows" => true,
        "mac" => matches!(arch, "x86_64" | "aarch64"),
        _ => arch == "x86_64",
    }
}

/// Expected base filename of the clangd binary on the given OS.
pub fn binary_name(os: &str) -> &'static str {
    if os == "windows" { "clangd.exe" } else { "clangd" }
}
