pub mod parse_osm;

use std::path::Path;
use log::{info, error};

use crate::errors::Result;

/// One cached stage of the pipeline. Outputs live in a directory; a stage
/// whose output is already there is skipped.
pub trait Etl {
    type Input;
    type Output;

    fn etl_name(&self) -> &str;

    fn is_cached(&self, dir: &Path) -> Result<bool>;
    fn clean(&self, dir: &Path) -> Result<()>;

    fn extract(&mut self, dir: &Path) -> Result<Self::Input>;
    fn transform(&mut self, input: Self::Input) -> Result<Self::Output>;
    fn load(&mut self, dir: &Path, output: Self::Output) -> Result<()>;

    fn process(&mut self, dir: &Path) -> Result<()> {
        let etl_name = self.etl_name().to_string();
        info!(etl_name = etl_name.as_str(); "Starting ETL process");
        if self.is_cached(dir)? {
            info!(etl_name = etl_name.as_str(); "Using cached value");
            return Ok(());
        }

        let input = logged_step(&etl_name, "extract", self.extract(dir))?;
        let output = logged_step(&etl_name, "transform", self.transform(input))?;
        logged_step(&etl_name, "load", self.load(dir, output))?;

        info!(etl_name = etl_name.as_str(); "Process finished");
        Ok(())
    }

    /// Drops any cached output and runs again.
    fn rerun(&mut self, dir: &Path) -> Result<()> {
        self.clean(dir)?;
        self.process(dir)
    }
}

fn logged_step<T>(etl_name: &str, step: &str, result: Result<T>) -> Result<T> {
    match &result {
        Ok(_) => info!(etl_name = etl_name, step = step; "Step done"),
        Err(err) => error!(etl_name = etl_name, step = step, err = err.to_string().as_str(); "Step failed with error"),
    }
    result
}
