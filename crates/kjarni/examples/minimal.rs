//! Smallest useful core: a moving entity, a fixed number of ticks, then a
//! clean shutdown. Run with `RUST_LOG=debug` to watch the kernel work.

use kjarni::prelude::*;

struct Position {
    x: f32,
}

struct Velocity {
    dx: f32,
}

struct MovementPlugin;

impl Plugin for MovementPlugin {
    fn build(&self, core: &mut Core) -> Result<()> {
        let e = core.create_entity();
        e.attach(core, Position { x: 0.0 })?;
        e.attach(core, Velocity { dx: 3.0 })?;

        core.add_system(UPDATE, "integrate", |core: &mut Core| {
            let dt = core.resource::<Time>()?.delta_secs();
            core.view::<(&mut Position, &Velocity)>(|_, _, (pos, vel)| {
                pos.x += vel.dx * dt;
            })
        })?;

        core.add_system(RENDER, "report", |core: &mut Core| {
            core.view::<(&Position,)>(|_, entity, (pos,)| {
                println!("{entity}: x = {:.3}", pos.x);
            })
        })
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let mut core = Core::new();
    core.add_plugin(TimePlugin);
    core.add_plugin(MovementPlugin);

    core.add_system(POST_UPDATE, "quit_after_60", |core: &mut Core| {
        if core.resource::<Time>()?.tick_count() >= 60 {
            core.stop();
        }
        Ok(())
    })?;

    core.run()
}
