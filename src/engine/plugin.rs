use bevy::prelude::*;
use std::sync::{Arc, RwLock};

use crate::battlefield::Battlefield;
use crate::explosion::{ExplosionReport, ExplosionRequest};
use crate::reaction::ReactionShot;
use crate::units::UnitId;

/// Hooks a battlefield into an ECS app. Explosions, FOV requests and
/// reaction checks arrive as events and are resolved in that order within
/// one `Update`.
pub struct BattlescapePlugin {
    battlefield: Arc<RwLock<Battlefield>>,
}

impl BattlescapePlugin {
    pub fn new(battlefield: Battlefield) -> Self {
        Self {
            battlefield: Arc::new(RwLock::new(battlefield)),
        }
    }

    /// Handle to the same battlefield the app will hold.
    pub fn shared(&self) -> Arc<RwLock<Battlefield>> {
        Arc::clone(&self.battlefield)
    }
}

impl Plugin for BattlescapePlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(BattlefieldResource(Arc::clone(&self.battlefield)))
            .add_event::<ExplosionRequested>()
            .add_event::<ExplosionResolved>()
            .add_event::<FovRequested>()
            .add_event::<ReactionCheckRequested>()
            .add_event::<ReactionFired>()
            .add_systems(
                Update,
                (resolve_explosions, refresh_fov, resolve_reactions).chain(),
            );
    }
}

#[derive(Resource)]
pub struct BattlefieldResource(pub Arc<RwLock<Battlefield>>);

/// Event: detonate a blast on the battlefield
#[derive(Event, Debug, Clone)]
pub struct ExplosionRequested(pub ExplosionRequest);

/// Event: a blast and its chained detonations were resolved
#[derive(Event, Debug, Clone)]
pub struct ExplosionResolved {
    pub request: ExplosionRequest,
    pub report: ExplosionReport,
}

/// Event: recompute one unit's view, or everyone's with `None`
#[derive(Event, Debug, Clone, Copy)]
pub struct FovRequested {
    pub unit: Option<UnitId>,
}

/// Event: a unit is about to spend `action_cost` time units in view of the enemy
#[derive(Event, Debug, Clone, Copy)]
pub struct ReactionCheckRequested {
    pub mover: UnitId,
    pub action_cost: i32,
}

/// Event: a reaction shot was taken and paid for
#[derive(Event, Debug, Clone, Copy)]
pub struct ReactionFired(pub ReactionShot);

fn resolve_explosions(
    mut requests: EventReader<ExplosionRequested>,
    mut resolved: EventWriter<ExplosionResolved>,
    battlefield: Res<BattlefieldResource>,
) {
    if requests.is_empty() {
        return;
    }
    let Ok(mut field) = battlefield.0.write() else {
        tracing::error!("battlefield lock poisoned, dropping explosion requests");
        requests.clear();
        return;
    };
    for ExplosionRequested(request) in requests.read() {
        let report = field.explode(*request);
        resolved.send(ExplosionResolved {
            request: *request,
            report,
        });
    }
}

fn refresh_fov(mut requests: EventReader<FovRequested>, battlefield: Res<BattlefieldResource>) {
    if requests.is_empty() {
        return;
    }
    let Ok(mut field) = battlefield.0.write() else {
        requests.clear();
        return;
    };
    for request in requests.read() {
        match request.unit {
            Some(unit) => {
                field.calculate_fov(unit);
            }
            None => {
                field.recalculate_all_fov();
            }
        }
    }
}

fn resolve_reactions(
    mut requests: EventReader<ReactionCheckRequested>,
    mut fired: EventWriter<ReactionFired>,
    battlefield: Res<BattlefieldResource>,
) {
    if requests.is_empty() {
        return;
    }
    let Ok(mut field) = battlefield.0.write() else {
        requests.clear();
        return;
    };
    for request in requests.read() {
        for shot in field.check_reaction_fire(request.mover, request.action_cost) {
            fired.send(ReactionFired(shot));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battlefield::fixtures::open_field;
    use crate::blockage::Phenomenon;
    use crate::explosion::impact_voxel;
    use crate::geometry::Direction;
    use crate::tiles::TilePart;
    use crate::units::{BattleUnit, Faction, Weapon};
    use bevy::math::IVec3;

    #[test]
    fn test_explosion_event_resolves() {
        let (mut field, parts) = open_field(IVec3::new(10, 10, 1));
        field
            .set_part(IVec3::new(5, 4, 0), TilePart::Content, Some(parts.crate_object))
            .unwrap();
        let plugin = BattlescapePlugin::new(field);
        let shared = plugin.shared();
        let mut app = App::new();
        app.add_plugins(plugin);

        let request = ExplosionRequest::new(
            impact_voxel(IVec3::new(5, 5, 0)),
            80,
            Phenomenon::Explosive,
            4,
        );
        app.world_mut().send_event(ExplosionRequested(request));
        app.update();

        let events = app.world().resource::<Events<ExplosionResolved>>();
        let resolved: Vec<&ExplosionResolved> = events.iter_current_update_events().collect();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].request, request);
        assert!(!resolved[0].report.affected.is_empty());

        let field = shared.read().unwrap();
        assert!(field.part_at(IVec3::new(5, 4, 0), TilePart::Content).is_none());
    }

    #[test]
    fn test_reaction_event_fires() {
        let (mut field, _) = open_field(IVec3::new(12, 12, 1));
        let shooter = field
            .add_unit(
                BattleUnit::new("sectoid", IVec3::new(2, 5, 0), Faction::Hostile)
                    .facing(Direction::East)
                    .armed(Weapon::rifle()),
            )
            .unwrap();
        let mover = field
            .add_unit(BattleUnit::new("rookie", IVec3::new(6, 5, 0), Faction::Player))
            .unwrap();
        let mut app = App::new();
        app.add_plugins(BattlescapePlugin::new(field));

        app.world_mut().send_event(FovRequested { unit: None });
        app.world_mut().send_event(ReactionCheckRequested {
            mover,
            action_cost: 20,
        });
        app.update();

        let events = app.world().resource::<Events<ReactionFired>>();
        let fired: Vec<&ReactionFired> = events.iter_current_update_events().collect();
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].0.shooter, shooter);

        let resource = app.world().resource::<BattlefieldResource>();
        let field = resource.0.read().unwrap();
        assert!(field.unit(shooter).unwrap().visible_units.contains(&mover));
    }

    #[test]
    fn test_idle_update_changes_nothing() {
        let (field, _) = open_field(IVec3::new(4, 4, 1));
        let digest = field.state_digest();
        let plugin = BattlescapePlugin::new(field);
        let shared = plugin.shared();
        let mut app = App::new();
        app.add_plugins(plugin);
        app.update();
        assert_eq!(shared.read().unwrap().state_digest(), digest);
    }
}
