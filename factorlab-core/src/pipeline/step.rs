//! `Step`, `freeze` and `compose`: the combinators pipelines are built from.
//!
//! A `Step<I, O>` is a named, cheaply cloneable, single-argument function from `&I` to
//! `Result<O>`. `freeze` turns a multi-parameter primitive into a step by binding its
//! options; `compose` (and `Step::then` / [`compose!`](crate::compose)) chain steps.
//!
//! Stage numbering: a composed step reports failures as [`PipelineError::Stage`] with the
//! flat position of the failing leaf step, however the chain was nested.

use std::fmt;
use std::sync::Arc;

use crate::error::{PipelineError, Result};
use crate::matrix::Matrix;

type StepFn<I, O> = dyn Fn(&I) -> Result<O> + Send + Sync;

/// A named pipeline stage.
pub struct Step<I = Matrix, O = Matrix> {
    name: Arc<str>,
    /// Number of leaf steps inside (1 for a frozen primitive).
    stages: usize,
    /// Built by `new`/`freeze` rather than by chaining.
    leaf: bool,
    func: Arc<StepFn<I, O>>,
}

impl<I, O> Clone for Step<I, O> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            stages: self.stages,
            leaf: self.leaf,
            func: Arc::clone(&self.func),
        }
    }
}

impl<I, O> fmt::Debug for Step<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("name", &self.name)
            .field("stages", &self.stages)
            .finish()
    }
}

impl<I: 'static, O: 'static> Step<I, O> {
    /// Wrap a function as a single leaf step.
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&I) -> Result<O> + Send + Sync + 'static,
    {
        Self {
            name: Arc::from(name.into()),
            stages: 1,
            leaf: true,
            func: Arc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of leaf steps this step is made of.
    pub fn stages(&self) -> usize {
        self.stages
    }

    /// Run the step. The input is only borrowed; the output is freshly allocated.
    pub fn apply(&self, input: &I) -> Result<O> {
        (self.func)(input)
    }

    /// `self` followed by `next`: `a.then(b).apply(x) == b.apply(&a.apply(x)?)`.
    pub fn then<P: 'static>(self, next: Step<O, P>) -> Step<I, P> {
        let offset = self.stages;
        let name = match (self.stages, next.stages) {
            (0, _) => next.name.to_string(),
            (_, 0) => self.name.to_string(),
            _ => format!("{} >> {}", self.name, next.name),
        };
        let first = self;
        let second = next;

        Step {
            name: Arc::from(name),
            stages: first.stages + second.stages,
            leaf: false,
            func: Arc::new(move |input: &I| {
                let mid = run_stage(&first, input, 0)?;
                run_stage(&second, &mid, offset)
            }),
        }
    }
}

impl<T: Clone + 'static> Step<T, T> {
    /// The step that returns a copy of its input. It counts as zero stages.
    pub fn identity() -> Self {
        Self {
            name: Arc::from("identity"),
            stages: 0,
            leaf: false,
            func: Arc::new(|input: &T| Ok(input.clone())),
        }
    }
}

/// Apply `step` as the stage(s) starting at flat position `offset`.
fn run_stage<I, O>(step: &Step<I, O>, input: &I, offset: usize) -> Result<O> {
    if step.leaf {
        tracing::debug!(stage = offset, name = %step.name, "applying pipeline stage");
    }
    (step.func)(input).map_err(|err| match err {
        PipelineError::Stage {
            index,
            stage,
            source,
        } if !step.leaf => PipelineError::Stage {
            index: index + offset,
            stage,
            source,
        },
        other => PipelineError::Stage {
            index: offset,
            stage: step.name.to_string(),
            source: Box::new(other),
        },
    })
}

/// Bind `options` to a two-argument primitive, producing a one-argument step.
///
/// `freeze(name, f, opts).apply(x)` is exactly `f(x, &opts)`. The options are captured
/// by value and only ever borrowed, so the step is referentially transparent.
pub fn freeze<I, O, P, F>(name: impl Into<String>, primitive: F, options: P) -> Step<I, O>
where
    I: 'static,
    O: 'static,
    P: Send + Sync + 'static,
    F: Fn(&I, &P) -> Result<O> + Send + Sync + 'static,
{
    Step::new(name, move |input: &I| primitive(input, &options))
}

/// Chain same-typed steps in order: `compose([f, g, h]).apply(x) == h(g(f(x)))`.
///
/// No checks run between stages beyond each stage's own. An empty list is the identity.
pub fn compose<T, S>(steps: S) -> Step<T, T>
where
    T: Clone + 'static,
    S: IntoIterator<Item = Step<T, T>>,
{
    steps
        .into_iter()
        .reduce(Step::then)
        .unwrap_or_else(Step::identity)
}

/// Chain steps whose types change along the way, e.g. ending in `evaluate`:
///
/// ```
/// use factorlab_core::compose;
/// use factorlab_core::pipeline::steps;
/// # use factorlab_core::matrix::Matrix;
/// # fn build(returns: Matrix) -> factorlab_core::Result<()> {
/// let pipeline = compose!(
///     steps::look_back(12, "pct".parse()?)?,
///     steps::lag(1),
///     steps::quantiles(0.8, 1.0)?,
///     steps::ew(),
///     steps::evaluate(returns),
/// );
/// # let _ = pipeline;
/// # Ok(())
/// # }
/// ```
#[macro_export]
macro_rules! compose {
    ($first:expr $(, $rest:expr)* $(,)?) => {{
        let step = $first;
        $( let step = step.then($rest); )*
        step
    }};
}
