//! The unit of work consumed by the scheduler

use core::fmt;

use crate::queue::{Link, Linked, Queue};

/// Link type embedded in every runnable
pub type RunnableLink = Link<dyn Runnable>;

/// Queue of runnables waiting for immediate dispatch
pub type RunnableQueue = Queue<dyn Runnable>;

/// Something that can be executed by a context.
///
/// The scheduler never takes ownership of a runnable; it only keeps
/// `&'static` references, which is what guarantees a runnable outlives every
/// pending request for it. Implementors embed a [`RunnableLink`] so that
/// dispatch requests can be queued without allocation.
pub trait Runnable: Sync {
    /// Run the work item in the calling context
    fn execute(&self);

    /// The embedded queue link
    fn queue_link(&self) -> &RunnableLink;
}

impl Linked for dyn Runnable {
    fn link(&self) -> &Link<Self> {
        self.queue_link()
    }
}

/// A runnable backed by a closure or function.
///
/// ```
/// use bsw_core::{Runnable, Work};
///
/// fn tick() {}
///
/// static TICK: Work<fn()> = Work::new(tick);
/// TICK.execute();
/// ```
pub struct Work<F> {
    link: RunnableLink,
    f: F,
}

impl<F: Fn() + Sync> Work<F> {
    /// Wrap `f` into a queueable runnable
    pub const fn new(f: F) -> Self {
        Self {
            link: Link::new(),
            f,
        }
    }
}

impl<F: Fn() + Sync> Runnable for Work<F> {
    fn execute(&self) {
        (self.f)()
    }

    fn queue_link(&self) -> &RunnableLink {
        &self.link
    }
}

impl<F> fmt::Debug for Work<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Work").field("link", &self.link).finish()
    }
}
