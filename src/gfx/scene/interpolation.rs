//! Linear transitions between an entity's previous and next state

use super::{
    entity::{Property, Transform},
    store::EntityRecord,
};

/// Blends `prev` toward `next` by `elapsed / duration`
///
/// Returns `next` once the transition is over or when there is none.
pub fn lerp_value(prev: f32, next: f32, elapsed: f32, duration: f32) -> f32 {
    if duration > 0.0 && elapsed < duration {
        prev + (next - prev) * elapsed.max(0.0) / duration
    } else {
        next
    }
}

/// Current value of one property of an entity
pub fn lerp(record: &EntityRecord, property: Property) -> f32 {
    lerp_value(
        record.previous.transform.get(property),
        record.next.transform.get(property),
        record.next.elapsed,
        record.next.duration,
    )
}

/// Current value of every transform property of an entity
pub fn lerp_transform(record: &EntityRecord) -> Transform {
    let mut out = record.next.transform;
    for property in Property::ALL {
        out.set(property, lerp(record, property));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::scene::entity::{EntityKind, EntityState};
    use approx::assert_abs_diff_eq;

    fn record(prev_x: f32, next_x: f32, elapsed: f32, duration: f32) -> EntityRecord {
        let mut previous = EntityState::defaults("a", EntityKind::Cube);
        previous.transform.x = prev_x;
        let mut next = previous.clone();
        next.transform.x = next_x;
        next.elapsed = elapsed;
        next.duration = duration;
        EntityRecord {
            previous,
            next,
            world: None,
        }
    }

    #[test]
    fn starts_at_previous() {
        assert_eq!(lerp(&record(2.0, 8.0, 0.0, 10.0), Property::X), 2.0);
    }

    #[test]
    fn halfway() {
        assert_abs_diff_eq!(lerp(&record(2.0, 8.0, 5.0, 10.0), Property::X), 5.0, epsilon = 1e-6);
    }

    #[test]
    fn finished_transition_is_next() {
        assert_eq!(lerp(&record(2.0, 8.0, 10.0, 10.0), Property::X), 8.0);
    }

    #[test]
    fn zero_duration_jumps_without_dividing() {
        let value = lerp(&record(2.0, 8.0, 0.0, 0.0), Property::X);
        assert_eq!(value, 8.0);
        assert!(value.is_finite());
    }

    #[test]
    fn stays_between_endpoints() {
        for step in 0..=20 {
            let value = lerp_value(-3.0, 7.0, step as f32 * 0.5, 10.0);
            assert!((-3.0..=7.0).contains(&value), "{value} out of range");
        }
    }

    #[test]
    fn whole_transform_follows_timer() {
        let mut rec = record(0.0, 4.0, 1.0, 4.0);
        rec.next.transform.ry = 90.0;
        let t = lerp_transform(&rec);
        assert_abs_diff_eq!(t.x, 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(t.ry, 22.5, epsilon = 1e-6);
        assert_eq!(t.w, 1.0);
    }
}
