//! Per-run state threaded through the pipeline stages

use serde::Serialize;

use crate::error::{Error, Result};

/// Pipeline progress. Runs move strictly forward, one step at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Uninitialized,
    CollectionValidated,
    PromptValidated,
    Retrieved,
    Generated,
}

impl PipelineStage {
    /// The only stage reachable from this one
    pub fn next(self) -> Option<PipelineStage> {
        use PipelineStage::*;
        match self {
            Uninitialized => Some(CollectionValidated),
            CollectionValidated => Some(PromptValidated),
            PromptValidated => Some(Retrieved),
            Retrieved => Some(Generated),
            Generated => None,
        }
    }
}

/// Collection and template for one run, fixed once the run starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub collection_name: String,
    pub prompt_template: String,
}

/// Data produced by one run. Built fresh for every invocation.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub query: String,
    pub retrieved_docs: Vec<String>,
    pub response: Option<String>,
    stage: PipelineStage,
}

impl SessionState {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            retrieved_docs: Vec::new(),
            response: None,
            stage: PipelineStage::Uninitialized,
        }
    }

    pub fn stage(&self) -> PipelineStage {
        self.stage
    }

    /// Move to `to`, which must directly follow the current stage
    pub fn advance(&mut self, to: PipelineStage) -> Result<()> {
        if self.stage.next() != Some(to) {
            return Err(Error::internal(format!(
                "invalid pipeline transition {:?} -> {:?}",
                self.stage, to
            )));
        }
        self.stage = to;
        Ok(())
    }

    /// Store retrieval output and enter `Retrieved`
    pub fn set_retrieved(&mut self, docs: Vec<String>) -> Result<()> {
        self.advance(PipelineStage::Retrieved)?;
        self.retrieved_docs = docs;
        Ok(())
    }

    /// Store the answer and enter `Generated`
    pub fn set_response(&mut self, response: String) -> Result<()> {
        self.advance(PipelineStage::Generated)?;
        self.response = Some(response);
        Ok(())
    }
}
