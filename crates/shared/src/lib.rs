pub mod payload;
pub mod units;

use std::fmt;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

pub use payload::{ImagePayload, PayloadError};
pub use units::{display_length, Unit};

/// Уникальный идентификатор детали внутри модели
pub type PartId = String;

/// Уникальный идентификатор модели в коллекции
pub type ModelId = String;

/// Тип примитива
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    Cube,
    Cylinder,
    Sphere,
    Wedge,
}

impl ShapeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShapeKind::Cube => "cube",
            ShapeKind::Cylinder => "cylinder",
            ShapeKind::Sphere => "sphere",
            ShapeKind::Wedge => "wedge",
        }
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Роль детали относительно накапливаемой сборки
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartOperation {
    /// Исходный объём, первая деталь модели
    Base,
    /// Объединение с предыдущей геометрией
    Add,
    /// Удаление материала (рисуется полупрозрачным наложением)
    Subtract,
}

impl PartOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            PartOperation::Base => "base",
            PartOperation::Add => "add",
            PartOperation::Subtract => "subtract",
        }
    }

    /// Ключевое слово для подписи в разнесённом виде: `BASE`, `ADD`, `SUBTRACT`
    pub fn keyword(&self) -> &'static str {
        match self {
            PartOperation::Base => "BASE",
            PartOperation::Add => "ADD",
            PartOperation::Subtract => "SUBTRACT",
        }
    }

    /// Глагол для шага сборки
    pub fn action(&self) -> &'static str {
        match self {
            PartOperation::Base => "Start with",
            PartOperation::Add => "Add",
            PartOperation::Subtract => "Subtract",
        }
    }
}

impl fmt::Display for PartOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Режим отображения модели
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    /// Детали в авторских позициях
    #[default]
    Assembled,
    /// Детали разложены по сетке с подписями
    Separated,
}

impl ViewMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewMode::Assembled => "assembled",
            ViewMode::Separated => "separated",
        }
    }
}

/// Принимает от 0 до 3 чисел и дополняет нулями до тройки.
///
/// Генератор иногда присылает `[r]` вместо `[r, 0, 0]` для сферы.
fn triple<'de, D>(deserializer: D) -> Result<[f64; 3], D::Error>
where
    D: Deserializer<'de>,
{
    let values = Vec::<f64>::deserialize(deserializer)?;
    if values.len() > 3 {
        return Err(D::Error::invalid_length(values.len(), &"at most 3 numbers"));
    }
    let mut out = [0.0; 3];
    out[..values.len()].copy_from_slice(&values);
    Ok(out)
}

/// Описание детали от AI-генератора (без идентификатора)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartSpec {
    #[serde(rename = "type")]
    pub shape: ShapeKind,
    pub operation: PartOperation,
    #[serde(deserialize_with = "triple")]
    pub dimensions: [f64; 3],
    #[serde(deserialize_with = "triple")]
    pub position: [f64; 3],
    #[serde(default, deserialize_with = "triple")]
    pub rotation: [f64; 3],
    #[serde(default)]
    pub explanation: String,
}

/// Деталь модели.
///
/// `dimensions` зависят от типа: куб `(w, h, d)`, цилиндр `(r, h, 0)`,
/// сфера `(r, 0, 0)`, клин `(w, h, d)`. `position` это центр габаритного
/// параллелепипеда в миллиметрах, `rotation` в градусах, порядок осей XYZ.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    pub id: PartId,
    #[serde(rename = "type")]
    pub shape: ShapeKind,
    pub operation: PartOperation,
    #[serde(deserialize_with = "triple")]
    pub dimensions: [f64; 3],
    #[serde(deserialize_with = "triple")]
    pub position: [f64; 3],
    #[serde(default, deserialize_with = "triple")]
    pub rotation: [f64; 3],
    #[serde(default)]
    pub explanation: String,
}

impl Part {
    /// Присвоить идентификатор описанию от генератора
    pub fn from_spec(id: PartId, spec: PartSpec) -> Self {
        Self {
            id,
            shape: spec.shape,
            operation: spec.operation,
            dimensions: spec.dimensions,
            position: spec.position,
            rotation: spec.rotation,
            explanation: spec.explanation,
        }
    }

    /// Половины размеров `dimensions / 2`
    pub fn half_extents(&self) -> [f64; 3] {
        let [a, b, c] = self.dimensions;
        [a / 2.0, b / 2.0, c / 2.0]
    }

    /// Наибольший из трёх размеров
    pub fn max_dimension(&self) -> f64 {
        self.dimensions.iter().copied().fold(0.0, f64::max)
    }

    /// Плоская деталь: третий размер равен нулю, линии глубины нет
    pub fn is_flat(&self) -> bool {
        self.dimensions[2] == 0.0
    }

    /// Половины габаритов реального тела с учётом типа примитива
    pub fn bounding_half_extents(&self) -> [f64; 3] {
        let [a, b, c] = self.dimensions;
        match self.shape {
            ShapeKind::Cube | ShapeKind::Wedge => [a / 2.0, b / 2.0, c / 2.0],
            ShapeKind::Cylinder => [a, b / 2.0, a],
            ShapeKind::Sphere => [a, a, a],
        }
    }
}

/// Модель: результат одной генерации по чертежу
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Model {
    pub id: ModelId,
    pub name: String,
    /// Момент создания, миллисекунды Unix
    pub timestamp: i64,
    /// Порядок важен: это порядок сборки и нумерация "Part N"
    pub parts: Vec<Part>,
    /// Исходный чертёж в виде data URL
    pub original_image: String,
}

impl Model {
    /// Опорная деталь: всегда первая в списке, независимо от операции
    pub fn anchor(&self) -> Option<&Part> {
        self.parts.first()
    }

    pub fn part(&self, id: &str) -> Option<&Part> {
        self.parts.iter().find(|p| p.id == id)
    }

    pub fn source_is_pdf(&self) -> bool {
        ImagePayload::parse(&self.original_image).is_pdf()
    }

    pub fn summary(&self) -> ModelSummary {
        ModelSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            timestamp: self.timestamp,
            part_count: self.parts.len(),
            is_pdf: self.source_is_pdf(),
        }
    }
}

/// Краткая запись для списка истории
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelSummary {
    pub id: ModelId,
    pub name: String,
    pub timestamp: i64,
    pub part_count: usize,
    pub is_pdf: bool,
}

/// Ответ AI-валидатора чертежа
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawingVerdict {
    pub is_valid: bool,
    #[serde(default)]
    pub reason: String,
}

/// Ответ AI-генератора: имя и список деталей без идентификаторов
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedModel {
    pub name: String,
    pub parts: Vec<PartSpec>,
}
