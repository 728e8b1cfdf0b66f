use std::path::Path;

use crate::error::{RobustError, Result};

pub fn check_not_empty<T>(values: &[T], name: &str) -> Result<()> {
    if values.is_empty() {
        return Err(RobustError::InvalidArgument(format!(
            "{name} must name at least one column"
        )));
    }
    Ok(())
}

pub fn check_positive(value: usize, name: &str) -> Result<()> {
    if value == 0 {
        return Err(RobustError::InvalidArgument(format!(
            "Value of {name} should be above 0"
        )));
    }
    Ok(())
}

pub fn check_kfold(kfold: usize, rows: usize) -> Result<()> {
    if kfold < 2 {
        return Err(RobustError::InvalidArgument(format!(
            "kfold should be at least 2, got {kfold}"
        )));
    }
    if kfold > rows {
        return Err(RobustError::InvalidArgument(format!(
            "kfold ({kfold}) cannot exceed the number of complete rows ({rows})"
        )));
    }
    Ok(())
}

pub fn check_distinct(names: &[String], name: &str) -> Result<()> {
    for (i, a) in names.iter().enumerate() {
        if names[i + 1..].contains(a) {
            return Err(RobustError::InvalidArgument(format!(
                "{name} lists {a} more than once"
            )));
        }
    }
    Ok(())
}

pub fn check_disjoint(left: &[String], right: &[String], left_name: &str, right_name: &str) -> Result<()> {
    if let Some(shared) = left.iter().find(|v| right.contains(v)) {
        return Err(RobustError::InvalidArgument(format!(
            "{shared} appears in both {left_name} and {right_name}"
        )));
    }
    Ok(())
}

pub fn check_file_exists(path: &Path, name: &str) -> Result<()> {
    if !path.exists() {
        return Err(RobustError::InvalidArgument(format!(
            "File {path:?} passed to {name} does not exist"
        )));
    }
    Ok(())
}
