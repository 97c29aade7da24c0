//! Color gradients used to turn trail intensities into display colors

use crate::{parameters::ConfigError, trail::FieldView, Precision};
use ndarray::Array2;

/// 8-bit RGB color
#[derive(Copy, Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Color of a gradient at a certain position within [0, 1]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ColorStop {
    pub position: Precision,
    pub color: Color,
}

/// Piecewise linear color gradient over [0, 1]
#[derive(Clone, Debug, PartialEq)]
pub struct Gradient {
    /// Color stops, sorted by position
    stops: Box<[ColorStop]>,
}
//
impl Gradient {
    /// Build a gradient from color stops sorted by position
    pub fn new(stops: impl IntoIterator<Item = ColorStop>) -> Result<Self, ConfigError> {
        let stops = stops.into_iter().collect::<Box<[_]>>();
        if stops.is_empty() {
            return Err(ConfigError::EmptyGradient);
        }
        for stop in stops.iter() {
            if !(0.0..=1.0).contains(&stop.position) {
                return Err(ConfigError::StopOutOfRange {
                    position: stop.position,
                });
            }
        }
        for pair in stops.windows(2) {
            if pair[1].position < pair[0].position {
                return Err(ConfigError::UnorderedStops {
                    previous: pair[0].position,
                    position: pair[1].position,
                });
            }
        }
        Ok(Self { stops })
    }

    /// Build a gradient from evenly spaced colors
    pub fn evenly_spaced(colors: impl IntoIterator<Item = Color>) -> Result<Self, ConfigError> {
        let colors = colors.into_iter().collect::<Vec<_>>();
        let last = colors.len().saturating_sub(1).max(1) as Precision;
        Self::new(
            colors
                .into_iter()
                .enumerate()
                .map(|(idx, color)| ColorStop {
                    position: idx as Precision / last,
                    color,
                }),
        )
    }

    /// Color stops of this gradient
    pub fn stops(&self) -> &[ColorStop] {
        &self.stops
    }

    /// Evaluate the gradient at a certain position
    ///
    /// Positions outside of [0, 1] are clamped, NaN maps to the first color.
    pub fn eval(&self, position: Precision) -> Color {
        let position = if position.is_nan() {
            0.0
        } else {
            position.clamp(0.0, 1.0)
        };

        // Locate the first stop that is strictly after the position
        let next_idx = self.stops.partition_point(|stop| stop.position <= position);
        if next_idx == 0 {
            return self.stops[0].color;
        }
        if next_idx == self.stops.len() {
            return self.stops[next_idx - 1].color;
        }

        // Interpolate between the surrounding stops
        let prev = &self.stops[next_idx - 1];
        let next = &self.stops[next_idx];
        let weight = (position - prev.position) / (next.position - prev.position);
        let lerp = |a: u8, b: u8| {
            let (a, b) = (Precision::from(a), Precision::from(b));
            (a + (b - a) * weight).round() as u8
        };
        Color {
            r: lerp(prev.color.r, next.color.r),
            g: lerp(prev.color.g, next.color.g),
            b: lerp(prev.color.b, next.color.b),
        }
    }

    /// Colorize a trail map
    ///
    /// Intensities are multiplied by `amplitude_scale` before gradient lookup,
    /// so that an intensity of `1 / amplitude_scale` maps to the last color.
    pub fn colorize(&self, field: FieldView<'_>, amplitude_scale: Precision) -> Array2<Color> {
        field.map(|&value| self.eval(value * amplitude_scale))
    }
}
