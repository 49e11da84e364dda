use anyhow::{Context, Result};
use bevy::math::IVec3;
use bevy::prelude::*;
use tracing::info;

use battlescape_core::engine::plugin::{
    BattlefieldResource, ExplosionRequested, ExplosionResolved, FovRequested,
    ReactionCheckRequested, ReactionFired,
};
use battlescape_core::explosion::impact_voxel;
use battlescape_core::logging::{init_tracing, LoggingPlugin, TracingConfig};
use battlescape_core::{
    BattleUnit, BattlescapePlugin, Battlefield, Direction, EngineConfig, ExplosionRequest,
    Faction, LoftLibrary, PartLibrary, Phenomenon, TilePart, Weapon,
};

/// Runs one scripted turn on a small walled yard: a soldier steps into the
/// open, the alien watching the gap reacts and a fuel tank goes up.
fn main() -> Result<()> {
    init_tracing(&TracingConfig::default());

    let config = match std::env::args().nth(1) {
        Some(path) => {
            EngineConfig::load(&path).with_context(|| format!("loading config from {path}"))?
        }
        None => EngineConfig::default(),
    };

    let field = build_yard(config).context("building demo battlefield")?;
    let plugin = BattlescapePlugin::new(field);
    let shared = plugin.shared();

    let mut app = App::new();
    app.add_plugins((LoggingPlugin::default(), plugin));

    let rookie = shared
        .read()
        .map_err(|_| anyhow::anyhow!("battlefield lock poisoned"))?
        .units()
        .find(|unit| unit.faction == Faction::Player)
        .map(|unit| unit.id)
        .context("no player unit on the field")?;

    app.world_mut().send_event(FovRequested { unit: None });
    app.world_mut().send_event(ReactionCheckRequested {
        mover: rookie,
        action_cost: 20,
    });
    app.update();

    {
        let events = app.world().resource::<Events<ReactionFired>>();
        for ReactionFired(shot) in events.iter_current_update_events() {
            info!(
                shooter = ?shot.shooter,
                target = ?shot.target,
                mode = ?shot.mode,
                cost = shot.cost,
                "reaction shot"
            );
        }
    }

    app.world_mut().send_event(ExplosionRequested(ExplosionRequest::new(
        impact_voxel(FUEL_TANK),
        90,
        Phenomenon::Explosive,
        6,
    )));
    app.world_mut().send_event(FovRequested { unit: None });
    app.update();

    {
        let events = app.world().resource::<Events<ExplosionResolved>>();
        for resolved in events.iter_current_update_events() {
            info!(
                tiles = resolved.report.affected.len(),
                destroyed = resolved.report.destroyed.len(),
                chained = resolved.report.chained.len(),
                wounded = resolved.report.damaged_units.len(),
                "explosion resolved"
            );
        }
    }

    let resource = app.world().resource::<BattlefieldResource>();
    let field = resource
        .0
        .read()
        .map_err(|_| anyhow::anyhow!("battlefield lock poisoned"))?;
    for unit in field.units() {
        info!(
            name = %unit.name,
            health = unit.health,
            time_units = unit.time_units,
            sees = unit.visible_units.len(),
            "unit after turn"
        );
    }
    let digest: String = field
        .state_digest()
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect();
    info!(%digest, "final battlefield state");
    Ok(())
}

const FUEL_TANK: IVec3 = IVec3::new(9, 6, 0);

fn build_yard(config: EngineConfig) -> Result<Battlefield> {
    let (parts, std_parts) = PartLibrary::standard();
    let mut field = Battlefield::new(config, IVec3::new(14, 14, 2), parts, LoftLibrary::standard())?;
    field.fill_level(0, std_parts.floor)?;

    // brick wall along x = 7 with a gap at y = 6..8
    for y in 0..14 {
        if !(6..8).contains(&y) {
            field.set_part(IVec3::new(7, y, 0), TilePart::WestWall, Some(std_parts.brick_west))?;
        }
    }
    field.set_part(FUEL_TANK, TilePart::Content, Some(std_parts.fuel_tank))?;
    field.set_part(IVec3::new(10, 9, 0), TilePart::Content, Some(std_parts.crate_object))?;
    field.set_part(IVec3::new(3, 3, 0), TilePart::Content, Some(std_parts.lamp_post))?;
    field.recalculate_lighting();

    field.add_unit(
        BattleUnit::new("sectoid", IVec3::new(11, 7, 0), Faction::Hostile)
            .facing(Direction::West)
            .armed(Weapon::rifle()),
    )?;
    field.add_unit(
        BattleUnit::new("rookie", IVec3::new(6, 7, 0), Faction::Player)
            .facing(Direction::East)
            .armed(Weapon::rifle()),
    )?;
    Ok(field)
}
