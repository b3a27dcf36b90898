use std::future::Future;

use serde::Serialize;

use crate::config::MAX_INTENSITY;

pub const DEFAULT_SCROLL_SPEED: u16 = 25;
pub const ANIMATION_POLL_MS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "level")]
pub enum Intensity {
    Off,
    Level(u8),
}

impl Intensity {
    pub fn from_step(step: i8) -> Self {
        if step < 0 {
            Self::Off
        } else {
            Self::Level((step as u8).min(MAX_INTENSITY))
        }
    }

    pub fn as_step(self) -> i8 {
        match self {
            Self::Off => -1,
            Self::Level(level) => level as i8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEffect {
    None,
    ScrollLeft,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    pub text: String,
    pub alignment: Alignment,
    pub scroll_speed: u16,
    pub pause_ms: u16,
    pub in_effect: TextEffect,
    pub out_effect: TextEffect,
}

impl RenderRequest {
    pub fn centered(text: &str) -> Self {
        Self {
            text: text.to_string(),
            alignment: Alignment::Center,
            scroll_speed: DEFAULT_SCROLL_SPEED,
            pause_ms: 0,
            in_effect: TextEffect::None,
            out_effect: TextEffect::None,
        }
    }

    pub fn scrolling(text: &str) -> Self {
        Self {
            in_effect: TextEffect::ScrollLeft,
            out_effect: TextEffect::ScrollLeft,
            ..Self::centered(text)
        }
    }
}

pub trait DisplaySink {
    fn clear(&mut self);

    fn render(&mut self, request: &RenderRequest);

    fn animate(&mut self) -> bool;

    fn set_intensity(&mut self, intensity: Intensity);

    fn set_flipped(&mut self, flipped: bool);
}

/// Polls `animate` until the sink reports the frame done, calling `pause`
/// between polls. There is no timeout: a sink that never finishes stalls the caller.
async fn until_rendered<S, F, Fut>(sink: &mut S, mut pause: F)
where
    S: DisplaySink,
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    while !sink.animate() {
        pause().await;
    }
}

pub struct ClockZone<S> {
    sink: S,
}

impl<S: DisplaySink> ClockZone<S> {
    pub fn new(sink: S) -> Self {
        Self { sink }
    }

    pub fn show_time(&mut self, text: &str) {
        self.sink.render(&RenderRequest::centered(text));
    }

    pub async fn until_rendered<F, Fut>(&mut self, pause: F)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ()>,
    {
        until_rendered(&mut self.sink, pause).await;
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}

pub struct RotatingZone<S> {
    sink: S,
}

impl<S: DisplaySink> RotatingZone<S> {
    pub fn new(sink: S) -> Self {
        Self { sink }
    }

    pub fn show(&mut self, text: &str) {
        self.sink.clear();
        self.sink.render(&RenderRequest::centered(text));
    }

    pub fn show_message(&mut self, text: &str) {
        self.sink.clear();
        self.sink.render(&RenderRequest::scrolling(text));
    }

    pub fn set_flipped(&mut self, flipped: bool) {
        self.sink.set_flipped(flipped);
    }

    pub async fn until_rendered<F, Fut>(&mut self, pause: F)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ()>,
    {
        until_rendered(&mut self.sink, pause).await;
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}

pub struct DisplayZones<C, R> {
    pub clock: ClockZone<C>,
    pub rotating: RotatingZone<R>,
}

impl<C: DisplaySink, R: DisplaySink> DisplayZones<C, R> {
    pub fn new(clock: C, rotating: R) -> Self {
        Self {
            clock: ClockZone::new(clock),
            rotating: RotatingZone::new(rotating),
        }
    }

    pub fn set_intensity(&mut self, intensity: Intensity) {
        self.clock.sink.set_intensity(intensity);
        self.rotating.sink.set_intensity(intensity);
    }
}


#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::testing::RecordingSink;
    use super::*;

    #[test]
    fn negative_steps_switch_the_display_off() {
        assert_eq!(Intensity::from_step(-1), Intensity::Off);
        assert_eq!(Intensity::from_step(0), Intensity::Level(0));
        assert_eq!(Intensity::from_step(42), Intensity::Level(15));
        assert_eq!(Intensity::Off.as_step(), -1);
    }

    #[test]
    fn intensity_reaches_both_zones() {
        let mut zones = DisplayZones::new(RecordingSink::default(), RecordingSink::default());
        zones.set_intensity(Intensity::Level(7));

        assert_eq!(zones.clock.sink().intensities, vec![Intensity::Level(7)]);
        assert_eq!(zones.rotating.sink().intensities, vec![Intensity::Level(7)]);
    }

    #[test]
    fn rotating_zone_clears_before_render() {
        let mut zone = RotatingZone::new(RecordingSink::default());
        zone.show("23.4C");

        assert_eq!(zone.sink().clears, 1);
        let request = &zone.sink().rendered[0];
        assert_eq!(request.alignment, Alignment::Center);
        assert_eq!(request.in_effect, TextEffect::None);
        assert_eq!(request.scroll_speed, DEFAULT_SCROLL_SPEED);
    }

    #[tokio::test]
    async fn waits_until_frame_completes() {
        let mut zone = RotatingZone::new(RecordingSink::with_frames(4));
        zone.show_message("Ready!");

        let pauses = Cell::new(0);
        zone.until_rendered(|| {
            pauses.set(pauses.get() + 1);
            async {}
        })
        .await;

        assert_eq!(zone.sink().polls, 4);
        assert_eq!(pauses.get(), 3);
        assert_eq!(zone.sink().rendered[0].in_effect, TextEffect::ScrollLeft);
    }
}
