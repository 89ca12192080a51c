// ─── Versioned strategy registry ───
// Ordered (predicate, factory) pairs. Selection is a linear first-match scan,
// so the order below is part of the behavior and pinned by tests.

use std::sync::Arc;

use tracing::debug;

use super::{ForgeGradle2Resolver, ForgeGradle3Resolver, Resolver};
use crate::core::error::{NebulaError, NebulaResult};
use crate::core::structure::{
    LegacyForgeModStructure, ModernForgeModStructure, ModuleStructure, StructureRoot,
};
use crate::core::tools::Toolchain;
use crate::core::version::{is_forge_gradle3, MinecraftVersion};

pub type VersionPredicate = fn(&MinecraftVersion, &str) -> bool;

pub struct Strategy<F> {
    pub name: &'static str,
    pub is_for_version: VersionPredicate,
    pub factory: F,
}

pub struct StrategyRegistry<F> {
    strategies: Vec<Strategy<F>>,
}

impl<F> StrategyRegistry<F> {
    pub fn new(strategies: Vec<Strategy<F>>) -> Self {
        Self { strategies }
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name).collect()
    }

    /// First strategy claiming the version pair.
    pub fn select(&self, minecraft: &MinecraftVersion, loader: &str) -> NebulaResult<&Strategy<F>> {
        let strategy = self
            .strategies
            .iter()
            .find(|s| (s.is_for_version)(minecraft, loader))
            .ok_or_else(|| NebulaError::NoStrategyFound {
                minecraft: minecraft.to_string(),
                loader: loader.to_string(),
            })?;
        debug!(
            "Selected {} for Minecraft {} / loader {}",
            strategy.name, minecraft, loader
        );
        Ok(strategy)
    }
}

fn forge_gradle2(minecraft: &MinecraftVersion, loader: &str) -> bool {
    minecraft.minor_in(7..=12) && !is_forge_gradle3(minecraft, loader)
}

fn forge_gradle3(minecraft: &MinecraftVersion, loader: &str) -> bool {
    minecraft.minor_in(12..=20) && is_forge_gradle3(minecraft, loader)
}

fn legacy_mods(minecraft: &MinecraftVersion, _loader: &str) -> bool {
    minecraft.minor_in(7..=12)
}

fn modern_mods(minecraft: &MinecraftVersion, _loader: &str) -> bool {
    minecraft.minor_in(13..=20)
}

pub type ResolverFactory = fn() -> Resolver;

fn gradle2_resolver() -> Resolver {
    Resolver::ForgeGradle2(ForgeGradle2Resolver)
}

fn gradle3_resolver() -> Resolver {
    Resolver::ForgeGradle3(ForgeGradle3Resolver)
}

pub fn resolver_registry() -> StrategyRegistry<ResolverFactory> {
    StrategyRegistry::new(vec![
        Strategy {
            name: "ForgeGradle2",
            is_for_version: forge_gradle2,
            factory: gradle2_resolver as ResolverFactory,
        },
        Strategy {
            name: "ForgeGradle3",
            is_for_version: forge_gradle3,
            factory: gradle3_resolver as ResolverFactory,
        },
    ])
}

/// Inputs of a forge mod structure factory.
pub struct StructureSetup {
    pub root: StructureRoot,
    pub minecraft_version: MinecraftVersion,
    pub toolchain: Arc<Toolchain>,
}

pub type StructureFactory = fn(StructureSetup) -> Box<dyn ModuleStructure>;

fn legacy_structure(setup: StructureSetup) -> Box<dyn ModuleStructure> {
    Box::new(LegacyForgeModStructure::new(
        setup.root,
        setup.minecraft_version,
        setup.toolchain,
    ))
}

fn modern_structure(setup: StructureSetup) -> Box<dyn ModuleStructure> {
    Box::new(ModernForgeModStructure::new(
        setup.root,
        setup.minecraft_version,
        setup.toolchain,
    ))
}

pub fn structure_registry() -> StrategyRegistry<StructureFactory> {
    StrategyRegistry::new(vec![
        Strategy {
            name: "LegacyForgeMods",
            is_for_version: legacy_mods,
            factory: legacy_structure as StructureFactory,
        },
        Strategy {
            name: "ModernForgeMods",
            is_for_version: modern_mods,
            factory: modern_structure as StructureFactory,
        },
    ])
}

pub fn select_resolver(minecraft: &MinecraftVersion, loader: &str) -> NebulaResult<Resolver> {
    let registry = resolver_registry();
    let strategy = registry.select(minecraft, loader)?;
    Ok((strategy.factory)())
}

pub fn select_structure(
    minecraft: &MinecraftVersion,
    loader: &str,
    setup: StructureSetup,
) -> NebulaResult<Box<dyn ModuleStructure>> {
    let registry = structure_registry();
    let strategy = registry.select(minecraft, loader)?;
    Ok((strategy.factory)(setup))
}
