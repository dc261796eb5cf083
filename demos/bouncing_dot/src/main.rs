//! Bouncing Dot Example
//!
//! Demonstrates the full flipbook pipeline: a user procedure animates a dot
//! on a background baking thread, the finished program crosses the mailbox,
//! and the presentation side scrubs it forward and backward without ever
//! re-running the procedure.

use flipbook_bake::{
    BakeConfig, BakeCx, BakeResult, BakeScheduler, EntitySeed, Poll, ProgramSlot, Wait,
};
use flipbook_core::{Ease, EntityId, FrameRate};
use flipbook_replay::Playback;
use std::sync::Arc;

/// The user procedure: drop a dot, bounce it twice, fade it out
struct BounceScript {
    step: usize,
    dot: EntityId,
}

impl BounceScript {
    fn new() -> Self {
        Self {
            step: 0,
            dot: EntityId::NONE,
        }
    }
}

impl flipbook_bake::Animator for BounceScript {
    fn resume(&mut self, cx: &mut BakeCx<'_>) -> BakeResult<Poll> {
        self.step += 1;
        match self.step {
            1 => {
                self.dot = cx.world.create(
                    EntitySeed::new("circle")
                        .with_field("x", 40.0)
                        .with_field("y", 0.0)
                        .with_field("opacity", 1.0)
                        .with_state("color", "tomato"),
                )?;
                cx.world.marker("drop");

                // Fall: ease-in to the floor
                let y = cx.world.field_property(self.dot, "y")?;
                cx.tween(y, 100.0, 0.8, Ease::InQuad);
                Ok(Poll::Pending(Wait::Seconds(0.8)))
            }
            2 => {
                cx.world.push_audio("bounce");
                let y = cx.world.field_property(self.dot, "y")?;
                cx.tween(y, 30.0, 0.5, Ease::OutQuad);
                Ok(Poll::Pending(Wait::Seconds(0.5)))
            }
            3 => {
                let y = cx.world.field_property(self.dot, "y")?;
                cx.tween(y, 100.0, 0.5, Ease::InQuad);
                Ok(Poll::Pending(Wait::Seconds(0.5)))
            }
            4 => {
                cx.world.marker("rest");
                cx.world.add_handle("dot-at-rest");
                let opacity = cx.world.field_property(self.dot, "opacity")?;
                cx.tween(opacity, 0.0, 0.4, Ease::Linear);
                // Outlive the fade so the tween releases its cell before the
                // dot (and the cell) goes away
                Ok(Poll::Pending(Wait::Seconds(0.5)))
            }
            _ => {
                cx.world.destroy(self.dot)?;
                Ok(Poll::Done)
            }
        }
    }
}

fn main() {
    tracing_subscriber::fmt().init();

    println!("=== Flipbook Bouncing Dot Example ===\n");

    // Bake on a background thread; publish through the mailbox
    let slot = Arc::new(ProgramSlot::new());
    let producer = Arc::clone(&slot);
    let baker = std::thread::spawn(move || {
        let mut scheduler = BakeScheduler::new(BakeConfig {
            fps: FrameRate(60),
            ..Default::default()
        });
        let baked = scheduler.bake(Box::new(BounceScript::new()));
        producer.publish(baked);
    });
    baker.join().expect("bake thread");

    // Presentation side: install and scrub
    let mut playback = Playback::new();
    assert!(playback.poll(&slot));

    println!(
        "baked {:.2}s of timeline, {} handle(s), {} audio cue(s)\n",
        playback.duration(),
        playback.handles().len(),
        playback.audio().cues.len()
    );

    println!("scrubbing forward:");
    for t in [0.0, 0.4, 0.8, 1.3, 1.8, 2.3] {
        print_frame(&mut playback, t);
    }

    println!("\nscrubbing backward:");
    for t in [1.3, 0.8, 0.0] {
        print_frame(&mut playback, t);
    }
}

fn print_frame(playback: &mut Playback, t: f64) {
    playback.seek_seconds(t);
    match playback.snapshot() {
        Some(snapshot) if !snapshot.entities.is_empty() => {
            let dot = &snapshot.entities[0];
            println!(
                "  t={:>4.2}  y={:>6.2}  opacity={:.2}",
                snapshot.time,
                dot.fields["y"].as_float().unwrap_or(0.0),
                dot.fields["opacity"].as_float().unwrap_or(0.0),
            );
        }
        _ => println!("  t={:>4.2}  (empty stage)", t),
    }
}
