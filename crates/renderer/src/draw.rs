//! Replaying the scene's draw ranges into a command stream.

use meshview_rhi::command::CommandBuffer;
use meshview_scene::DrawRange;

/// Anything that can record one indexed draw.
pub trait IndexedDrawSink {
    fn draw_range(&mut self, range: DrawRange);
}

impl IndexedDrawSink for CommandBuffer {
    fn draw_range(&mut self, range: DrawRange) {
        self.draw_indexed(range.index_count, 1, range.first_index, 0, 0);
    }
}

/// Issues one draw per range, including empty ranges. Returns the draw count.
pub fn record_draws<S, I>(sink: &mut S, ranges: I) -> usize
where
    S: IndexedDrawSink + ?Sized,
    I: IntoIterator<Item = DrawRange>,
{
    let mut draws = 0;
    for range in ranges {
        sink.draw_range(range);
        draws += 1;
    }
    draws
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshview_scene::draw_ranges_from_markers;

    #[derive(Default)]
    struct Recorder(Vec<DrawRange>);

    impl IndexedDrawSink for Recorder {
        fn draw_range(&mut self, range: DrawRange) {
            self.0.push(range);
        }
    }

    #[test]
    fn test_record_draws_includes_empty_ranges() {
        let mut recorder = Recorder::default();
        let count = record_draws(&mut recorder, draw_ranges_from_markers(&[3, 3, 9]));

        assert_eq!(count, 3);
        assert_eq!(recorder.0[1].index_count, 0);
    }

    #[test]
    fn test_record_draws_with_no_models() {
        let mut recorder = Recorder::default();
        assert_eq!(record_draws(&mut recorder, Vec::new()), 0);
        assert!(recorder.0.is_empty());
    }
}
