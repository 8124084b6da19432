//! Result data types.
//!
//! A lab answers with a list of blocks (or groups of blocks). Each block
//! serializes as `[{"title": ...}, {"graphs": [...]}]`, and inside it every
//! x-series graph is followed by the y-series plotted against it.

use serde::ser::SerializeSeq;
use serde::{Deserialize, Serialize, Serializer};

use crate::{ResultsError, ResultsResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEntry {
    pub name: String,
    /// Legend label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fname: Option<String>,
    pub values: Vec<f64>,
}

impl GraphEntry {
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            fname: None,
            values,
        }
    }

    pub fn with_fname(mut self, fname: impl Into<String>) -> Self {
        self.fname = Some(fname.into());
        self
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResultBlock {
    pub title: String,
    pub graphs: Vec<GraphEntry>,
}

impl ResultBlock {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            graphs: Vec::new(),
        }
    }

    /// Append an x series and the y series plotted against it.
    pub fn push_series(&mut self, x: GraphEntry, ys: Vec<GraphEntry>) -> ResultsResult<()> {
        if ys.is_empty() {
            return Err(ResultsError::InvalidArg {
                what: "an x series needs at least one y series",
            });
        }
        for y in &ys {
            if y.len() != x.len() {
                return Err(ResultsError::LengthMismatch {
                    what: "graph series",
                    left: x.len(),
                    right: y.len(),
                });
            }
        }
        self.graphs.push(x);
        self.graphs.extend(ys);
        Ok(())
    }

    /// Builder form of [`ResultBlock::push_series`] for a single pair.
    pub fn with_pair(mut self, x: GraphEntry, y: GraphEntry) -> ResultsResult<Self> {
        self.push_series(x, vec![y])?;
        Ok(self)
    }
}

#[derive(Serialize)]
struct Title<'a> {
    title: &'a str,
}

#[derive(Serialize)]
struct Graphs<'a> {
    graphs: &'a [GraphEntry],
}

impl Serialize for ResultBlock {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(2))?;
        seq.serialize_element(&Title { title: &self.title })?;
        seq.serialize_element(&Graphs {
            graphs: &self.graphs,
        })?;
        seq.end()
    }
}

/// One element of a lab's answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LabOutputItem {
    Block(ResultBlock),
    Group(Vec<ResultBlock>),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct LabOutput(pub Vec<LabOutputItem>);

impl LabOutput {
    pub fn push_block(&mut self, block: ResultBlock) {
        self.0.push(LabOutputItem::Block(block));
    }

    pub fn push_group(&mut self, blocks: Vec<ResultBlock>) {
        self.0.push(LabOutputItem::Group(blocks));
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Every block, groups flattened, in order.
    pub fn blocks(&self) -> impl Iterator<Item = &ResultBlock> {
        self.0.iter().flat_map(|item| match item {
            LabOutputItem::Block(b) => std::slice::from_ref(b),
            LabOutputItem::Group(g) => g.as_slice(),
        })
    }

    pub fn to_json(&self) -> ResultsResult<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}
