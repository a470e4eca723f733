//! Единицы отображения длины.
//!
//! Все размеры и позиции хранятся в миллиметрах; единица влияет только на
//! текст подписей и шагов сборки.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Единица отображения
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    #[default]
    Mm,
    Cm,
    M,
}

impl Unit {
    /// Суффикс единицы
    pub fn abbrev(&self) -> &'static str {
        match self {
            Unit::Mm => "mm",
            Unit::Cm => "cm",
            Unit::M => "m",
        }
    }

    /// Сколько миллиметров в одной единице
    pub fn to_mm(&self) -> f64 {
        match self {
            Unit::Mm => 1.0,
            Unit::Cm => 10.0,
            Unit::M => 1000.0,
        }
    }

    /// Перевести миллиметры в эту единицу
    pub fn from_mm(&self, value_mm: f64) -> f64 {
        value_mm / self.to_mm()
    }

    pub fn all() -> &'static [Unit] {
        &[Unit::Mm, Unit::Cm, Unit::M]
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.abbrev())
    }
}

impl FromStr for Unit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mm" | "millimeters" => Ok(Unit::Mm),
            "cm" | "centimeters" => Ok(Unit::Cm),
            "m" | "meters" => Ok(Unit::M),
            other => Err(format!("Unknown unit: {other}")),
        }
    }
}

/// Длина в выбранной единице с одним знаком после запятой: `"125.0mm"`.
///
/// Единственная точка форматирования размеров: ею пользуются и размерные
/// линии, и текст шагов сборки. Половина округляется вверх (`0.25` -> `0.3`),
/// а не к чётному, как в `{:.1}`.
pub fn display_length(value_mm: f64, unit: Unit) -> String {
    let rounded = (unit.from_mm(value_mm) * 10.0).round() / 10.0;
    format!("{:.1}{}", rounded, unit.abbrev())
}
