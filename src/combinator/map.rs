use crate::error::{Fault, RuntimeError};
use crate::instruction::{Completion, Instruction, Operation, Step};

/// Transforms the finished value of an operation
///
/// Finishes in exactly the tick `inner` does.
pub struct Map<O, F, T> {
    inner: O,
    transform: F,
    completion: Completion<T>,
}

impl<O, F, T> Map<O, F, T>
where
    O: Operation,
    F: FnMut(O::Output) -> T + Send,
    T: Clone + Send,
{
    pub fn new(inner: O, transform: F) -> Self {
        Self {
            inner,
            transform,
            completion: Completion::new(),
        }
    }
}

impl<O, F, T> Instruction for Map<O, F, T>
where
    O: Operation,
    F: FnMut(O::Output) -> T + Send,
    T: Clone + Send,
{
    fn step(&mut self) -> Result<Step, Fault> {
        self.completion.ensure_running(self.name())?;
        match self.inner.step()? {
            Step::Continue => Ok(Step::Continue),
            Step::Done => {
                let value = (self.transform)(self.inner.value()?);
                Ok(self.completion.complete(value))
            }
        }
    }

    fn is_resettable(&self) -> bool {
        self.inner.is_resettable()
    }

    fn reset(&mut self) -> Result<(), RuntimeError> {
        self.inner.reset()?;
        self.completion.clear();
        Ok(())
    }
}

impl<O, F, T> Operation for Map<O, F, T>
where
    O: Operation,
    F: FnMut(O::Output) -> T + Send,
    T: Clone + Send,
{
    type Output = T;

    fn is_done(&self) -> bool {
        self.completion.is_done()
    }

    fn value(&self) -> Result<T, RuntimeError> {
        self.completion.value()
    }
}
