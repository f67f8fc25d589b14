use super::*;

impl GameEngine {
    pub(super) fn spawn_ghost(&mut self) -> u64 {
        let edge = SpawnEdge::ALL[self.rng.pick_index(SpawnEdge::ALL.len())];
        let spawn = pick_spawn_position(edge, self.viewport, &mut self.rng);
        let base_speed = self
            .rng
            .range_f32(GHOST_MIN_BASE_SPEED, GHOST_MAX_BASE_SPEED);
        let id = self.next_ghost_id;
        self.next_ghost_id += 1;
        self.ghosts.insert(
            id,
            Ghost {
                id,
                x: spawn.x,
                y: spawn.y,
                speed: base_speed * self.difficulty * self.speed_boost,
                fade: 0.0,
            },
        );
        self.ghosts_spawned += 1;
        self.events.push(RuntimeEvent::GhostSpawned { ghost_id: id, edge });
        id
    }
}

pub(super) fn pick_spawn_position(edge: SpawnEdge, viewport: Viewport, rng: &mut Rng) -> Vec2 {
    let side_span = (viewport.height - SIDE_SPAWN_BOTTOM_INSET).max(1.0);
    match edge {
        SpawnEdge::Left => Vec2 {
            x: -SPAWN_MARGIN,
            y: rng.range_f32(0.0, side_span),
        },
        SpawnEdge::Right => Vec2 {
            x: viewport.width + SPAWN_MARGIN,
            y: rng.range_f32(0.0, side_span),
        },
        SpawnEdge::Top => Vec2 {
            x: rng.range_f32(0.0, viewport.width),
            y: -SPAWN_MARGIN,
        },
        SpawnEdge::Bottom => Vec2 {
            x: rng.range_f32(0.0, viewport.width),
            y: viewport.height + SPAWN_MARGIN,
        },
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::rng::Rng;

    fn edge_strategy() -> impl Strategy<Value = SpawnEdge> {
        prop_oneof![
            Just(SpawnEdge::Left),
            Just(SpawnEdge::Right),
            Just(SpawnEdge::Top),
            Just(SpawnEdge::Bottom),
        ]
    }

    proptest! {
        #[test]
        fn spawn_lands_outside_its_edge(
            edge in edge_strategy(),
            seed in any::<u32>(),
            width in 100.0f32..2_000.0,
            height in 100.0f32..2_000.0,
        ) {
            let viewport = Viewport::new(width, height);
            let mut rng = Rng::new(seed);
            let spawn = pick_spawn_position(edge, viewport, &mut rng);
            prop_assert!(!viewport.contains(spawn.x, spawn.y));
            match edge {
                SpawnEdge::Left => prop_assert!(spawn.x < 0.0),
                SpawnEdge::Right => prop_assert!(spawn.x > width),
                SpawnEdge::Top => prop_assert!(spawn.y < 0.0),
                SpawnEdge::Bottom => prop_assert!(spawn.y > height),
            }
        }
    }

    #[test]
    fn side_spawns_stay_above_bottom_inset() {
        let viewport = Viewport::new(400.0, 800.0);
        let mut rng = Rng::new(11);
        for _ in 0..1_000 {
            let spawn = pick_spawn_position(SpawnEdge::Left, viewport, &mut rng);
            assert!(spawn.y >= 0.0 && spawn.y < 600.0);
        }
    }

    #[test]
    fn spawned_speed_scales_with_difficulty_and_boost() {
        let mut engine = GameEngine::new(5, Viewport::default());
        engine.start();
        engine.difficulty = 2.0;
        engine.speed_boost = 1.5;
        let id = engine.spawn_ghost();
        let ghost = engine.ghost(id).expect("ghost exists");
        assert!(ghost.speed >= 1.0 * 3.0 && ghost.speed < 3.0 * 3.0);
        assert_eq!(ghost.fade, 0.0);
    }
}
