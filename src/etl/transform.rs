//! Per-item conversion step of a pipeline

use eyre::Result;
use std::marker::PhantomData;

/// Converts one item at a time
///
/// Record preparation is built from small transformers chained in order:
/// [`FieldMapper`](crate::transform::FieldMapper), then
/// [`DefaultFiller`](crate::transform::DefaultFiller), then
/// [`NumberParser`](crate::transform::NumberParser).
pub trait Transformer: Send + Sync {
    type Input: Send;
    type Output: Send;

    fn transform(&self, input: Self::Input) -> Result<Self::Output>;

    /// Transform every item, stopping at the first error
    fn transform_many(&self, inputs: Vec<Self::Input>) -> Result<Vec<Self::Output>> {
        inputs.into_iter().map(|i| self.transform(i)).collect()
    }
}

/// Pass-through step for exports, which write rows as the store returns them
pub struct IdentityTransformer<T>(PhantomData<T>);

impl<T> Default for IdentityTransformer<T> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<T> IdentityTransformer<T> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<T: Send + Sync> Transformer for IdentityTransformer<T> {
    type Input = T;
    type Output = T;

    fn transform(&self, input: Self::Input) -> Result<Self::Output> {
        Ok(input)
    }
}
