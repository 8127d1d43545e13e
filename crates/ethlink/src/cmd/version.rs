use ethlink_frame::{MAX_CHUNK, MIN_FRAME};

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("ethlink {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: ethlink");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "build_target: {}",
        option_env!("ETHLINK_BUILD_TARGET").unwrap_or("unknown")
    );
    println!(
        "build_profile: {}",
        option_env!("ETHLINK_BUILD_PROFILE").unwrap_or("unknown")
    );
    println!("frame: max_chunk={MAX_CHUNK} min_frame={MIN_FRAME}");
    println!("links: {}", available_links().join(", "));

    Ok(SUCCESS)
}

fn available_links() -> Vec<&'static str> {
    let mut links = vec!["memory"];
    if cfg!(unix) {
        links.push("unix-datagram");
    }
    if cfg!(target_os = "linux") {
        links.push("raw-ethernet");
    }
    links
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_link_is_always_available() {
        assert_eq!(available_links()[0], "memory");
    }
}
