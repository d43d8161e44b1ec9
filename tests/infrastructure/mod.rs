mod engines;
mod runtime;
