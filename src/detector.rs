//! Capability interface over interchangeable detector backends.

use crate::detection::Prediction;

/// Anything that turns an input image `I` into predictions in normalized space.
pub trait Detector<I: ?Sized> {
    fn predict(&self, input: &I) -> Vec<Prediction>;
}

impl<I: ?Sized, F> Detector<I> for F
where
    F: Fn(&I) -> Vec<Prediction>,
{
    #[inline]
    fn predict(&self, input: &I) -> Vec<Prediction> {
        self(input)
    }
}

/// Runs several backends on the same input and concatenates their output.
pub struct Combined<I: ?Sized> {
    backends: Vec<Box<dyn Detector<I> + Send + Sync>>,
}

impl<I: ?Sized> Combined<I> {
    pub fn new() -> Self {
        Self {
            backends: Vec::new(),
        }
    }

    pub fn with<D>(mut self, backend: D) -> Self
    where
        D: Detector<I> + Send + Sync + 'static,
    {
        self.backends.push(Box::new(backend));
        self
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.backends.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}

impl<I: ?Sized> Default for Combined<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: ?Sized> Detector<I> for Combined<I> {
    fn predict(&self, input: &I) -> Vec<Prediction> {
        self.backends
            .iter()
            .flat_map(|b| b.predict(input))
            .collect()
    }
}

/// Returns the same predictions for every input.
#[derive(Debug, Clone, Default)]
pub struct Fixed {
    pub predictions: Vec<Prediction>,
}

impl Fixed {
    pub fn new(predictions: Vec<Prediction>) -> Self {
        Self { predictions }
    }
}

impl<I: ?Sized> Detector<I> for Fixed {
    fn predict(&self, _input: &I) -> Vec<Prediction> {
        self.predictions.clone()
    }
}
