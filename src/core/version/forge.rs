// ─── Forge versioning ───
// Helpers for telling Forge generations apart and naming their artifacts.

use super::minecraft::MinecraftVersion;

/// Last Forge build for 1.12.2 produced by ForgeGradle 2. Later 1.12.2 builds
/// ship an installer in the ForgeGradle 3 layout.
const LAST_FORGE_GRADLE2_BUILD: [u64; 4] = [14, 23, 5, 2847];

/// Whether this Forge build uses the installer-driven (ForgeGradle 3+) layout.
pub fn is_forge_gradle3(minecraft: &MinecraftVersion, forge_version: &str) -> bool {
    if minecraft.major() != 1 {
        return false;
    }
    match minecraft.minor() {
        m if m > 12 => true,
        m if m < 12 => false,
        _ => {
            let parsed: Vec<u64> = forge_version
                .split('.')
                .map(|p| p.trim().parse::<u64>().unwrap_or(0))
                .collect();
            for (i, max) in LAST_FORGE_GRADLE2_BUILD.iter().enumerate() {
                let current = parsed.get(i).copied().unwrap_or(0);
                if current > *max {
                    return true;
                }
                if current < *max {
                    return false;
                }
            }
            false
        }
    }
}

/// Version component of the Forge maven artifact,
/// e.g. `1.12.2-14.23.5.2847`.
///
/// 1.7.10 and 1.8.9 builds carry the game version a second time as suffix.
pub fn forge_artifact_version(minecraft: &MinecraftVersion, forge_version: &str) -> String {
    let mc = minecraft.to_string();
    match mc.as_str() {
        "1.7.10" | "1.8.9" => format!("{mc}-{forge_version}-{mc}"),
        _ => format!("{mc}-{forge_version}"),
    }
}

/// Id of the version manifest the installer writes under `versions/`.
pub fn forge_version_manifest_id(minecraft: &MinecraftVersion, forge_version: &str) -> String {
    format!("{}-forge-{}", minecraft, forge_version)
}
