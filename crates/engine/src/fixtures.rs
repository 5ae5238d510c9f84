// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Policies used by tests across the workspace

use crate::error::PolicyError;
use crate::process::{Policy, ProcessingEvent};
use herald_core::fixtures::{Counter, DogEvent};
use herald_core::{Envelope, ProcessRecorder};

/// Counts how often each trick is taught
#[derive(Debug, Default, Clone, Copy)]
pub struct Counters;

impl Policy for Counters {
    type Event = DogEvent;

    fn policy<R: ProcessRecorder + ?Sized>(
        &self,
        event: &Envelope<DogEvent>,
        processing: &mut ProcessingEvent<'_, R>,
    ) -> Result<(), PolicyError> {
        match &event.event {
            DogEvent::TrickAdded { trick } => {
                let mut counter = match processing.get::<Counter>(Counter::id_for(trick))? {
                    Some(counter) => counter,
                    None => Counter::start_for(trick)?,
                };
                counter.increment()?;
                processing.collect(&mut counter)
            }
            _ => Ok(()),
        }
    }
}
