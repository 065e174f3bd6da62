//! Minimal container types for unit tests

use std::any::Any;

use crate::container::{ContainerCore, ModelPart, PartContainer};
use crate::id::PartId;
use crate::labels::LabelSupport;
use crate::xml::XmlElement;
use crate::Result;

pub struct Owner {
    core: ContainerCore,
    name: String,
    labels: LabelSupport,
}

impl Default for Owner {
    fn default() -> Self {
        Self {
            core: ContainerCore::object().with_parts::<Item>(),
            name: String::new(),
            labels: LabelSupport::new(),
        }
    }
}

impl Owner {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: &str) -> bool {
        let mut current = std::mem::take(&mut self.name);
        let changed = self.core.update(&mut current, name.to_string(), "name");
        self.name = current;
        changed
    }
}

impl PartContainer for Owner {
    fn core(&self) -> &ContainerCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ContainerCore {
        &mut self.core
    }

    fn kind(&self) -> &'static str {
        "Owner"
    }

    fn write_properties(&self, element: &mut XmlElement) {
        element.set_attribute("name", &self.name);
    }

    fn read_properties(&mut self, element: &XmlElement) -> Result<()> {
        self.name = element.attribute("name").unwrap_or_default().to_string();
        Ok(())
    }

    fn label_support(&self) -> Option<&LabelSupport> {
        Some(&self.labels)
    }

    fn label_support_mut(&mut self) -> Option<&mut LabelSupport> {
        Some(&mut self.labels)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

pub struct Item {
    core: ContainerCore,
    name: String,
}

impl Item {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl ModelPart for Item {
    const TAG: &'static str = "Item";

    fn with_id(id: PartId) -> Self {
        Self {
            core: ContainerCore::part(id),
            name: String::new(),
        }
    }
}

impl PartContainer for Item {
    fn core(&self) -> &ContainerCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ContainerCore {
        &mut self.core
    }

    fn kind(&self) -> &'static str {
        Self::TAG
    }

    fn write_properties(&self, element: &mut XmlElement) {
        element.set_optional_attribute("name", Some(self.name.as_str()).filter(|n| !n.is_empty()));
    }

    fn read_properties(&mut self, element: &XmlElement) -> Result<()> {
        self.name = element.attribute("name").unwrap_or_default().to_string();
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
