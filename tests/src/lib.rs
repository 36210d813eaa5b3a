#[cfg(test)]
mod pipeline;
#[cfg(test)]
mod sweep;
#[cfg(test)]
mod util;
