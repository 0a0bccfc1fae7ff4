use crate::block::Block;
use crate::error::{ModelError, ModelResult};
use crate::styles::Styles;
use crate::tree::walk;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;

/// Paper format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageFormat {
    #[default]
    A4,
    A3,
    A5,
    Letter,
    Legal,
}

impl PageFormat {
    /// Portrait (width, height) in millimetres
    pub fn dimensions_mm(&self) -> (f64, f64) {
        match self {
            PageFormat::A4 => (210.0, 297.0),
            PageFormat::A3 => (297.0, 420.0),
            PageFormat::A5 => (148.0, 210.0),
            PageFormat::Letter => (215.9, 279.4),
            PageFormat::Legal => (215.9, 355.6),
        }
    }

    /// Name understood by the CSS `@page { size }` descriptor
    pub fn css_name(&self) -> &'static str {
        match self {
            PageFormat::A4 => "A4",
            PageFormat::A3 => "A3",
            PageFormat::A5 => "A5",
            PageFormat::Letter => "letter",
            PageFormat::Legal => "legal",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

impl Orientation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Orientation::Portrait => "portrait",
            Orientation::Landscape => "landscape",
        }
    }
}

/// Page margins in millimetres
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Margins {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Default for Margins {
    fn default() -> Self {
        Self {
            top: 20.0,
            right: 20.0,
            bottom: 20.0,
            left: 20.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageSettings {
    pub format: PageFormat,
    pub orientation: Orientation,
    pub margins: Margins,
}

impl PageSettings {
    /// Page (width, height) in millimetres, honouring orientation
    pub fn page_size_mm(&self) -> (f64, f64) {
        let (w, h) = self.format.dimensions_mm();
        match self.orientation {
            Orientation::Portrait => (w, h),
            Orientation::Landscape => (h, w),
        }
    }
}

/// Named sample data used for previews and schema checks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataExample {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl DataExample {
    pub fn new(id: impl Into<String>, name: impl Into<String>, data: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            data,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub blocks: Vec<Block>,
    #[serde(default)]
    pub document_styles: Styles,
    #[serde(default)]
    pub page_settings: PageSettings,
    #[serde(default)]
    pub data_examples: Vec<DataExample>,
    #[serde(default)]
    pub schema: Option<Value>,
}

impl Template {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            blocks: Vec::new(),
            document_styles: Styles::new(),
            page_settings: PageSettings::default(),
            data_examples: Vec::new(),
            schema: None,
        }
    }

    /// Decode and validate a template
    pub fn from_json(json: &str) -> ModelResult<Self> {
        let template: Template = serde_json::from_str(json)?;
        template.validate()?;
        Ok(template)
    }

    pub fn to_json(&self) -> ModelResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> ModelResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check id uniqueness across blocks, columns, rows, cells and examples,
    /// and the merge records of every table
    pub fn validate(&self) -> ModelResult<()> {
        let mut seen = HashSet::new();
        for id in self.collect_ids() {
            if !seen.insert(id.clone()) {
                return Err(ModelError::DuplicateId(id));
            }
        }

        let mut examples = HashSet::new();
        for example in &self.data_examples {
            if !examples.insert(example.id.as_str()) {
                return Err(ModelError::DuplicateExample(example.id.clone()));
            }
        }

        let mut merges = Ok(());
        walk(&self.blocks, &mut |block, _| {
            if let Block::Table(table) = block {
                if merges.is_ok() {
                    merges = table.check_merges();
                }
            }
        });
        merges
    }

    pub fn data_example(&self, id: &str) -> Option<&DataExample> {
        self.data_examples.iter().find(|e| e.id == id)
    }

    pub fn add_data_example(&mut self, example: DataExample) -> ModelResult<()> {
        if self.data_example(&example.id).is_some() {
            return Err(ModelError::DuplicateExample(example.id));
        }
        self.data_examples.push(example);
        Ok(())
    }

    /// Replace the example with the same id
    pub fn update_data_example(&mut self, example: DataExample) -> ModelResult<()> {
        let slot = self
            .data_examples
            .iter_mut()
            .find(|e| e.id == example.id)
            .ok_or_else(|| ModelError::ExampleNotFound(example.id.clone()))?;
        *slot = example;
        Ok(())
    }

    pub fn remove_data_example(&mut self, id: &str) -> ModelResult<DataExample> {
        let index = self
            .data_examples
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| ModelError::ExampleNotFound(id.to_string()))?;
        Ok(self.data_examples.remove(index))
    }
}
