use sniffr_common::network::interface::{self, InterfaceBinding};

use crate::terminal::{format, print};

pub fn interfaces() {
    let mut bindings: Vec<InterfaceBinding> = interface::discover_bindings()
        .into_iter()
        .map(|(_, binding)| binding)
        .collect();
    interface::sort_for_display(&mut bindings);

    if bindings.is_empty() {
        print::print_status("No network interfaces found.");
        return;
    }

    for (idx, binding) in bindings.iter().enumerate() {
        print::tree_head(idx, &binding.name);
        print::as_tree_one_level(format::binding_to_key_value_pair(binding));
    }
}
