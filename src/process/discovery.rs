//! Descendant discovery: turns a before/after snapshot pair into the
//! tracked-PID set for a service.

use super::inventory::{Pid, ProcInfo, ProcessInventory};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;

pub struct DiscoveryInput<'a> {
    pub before: &'a HashMap<Pid, ProcInfo>,
    pub after: &'a HashMap<Pid, ProcInfo>,
    pub direct_child: Pid,
    pub profile_flag: Option<&'a str>,
    pub exe_path: &'a Path,
    pub process_names: &'a [String],
    pub ancestor_depth: u32,
    pub descendant_limit: usize,
}

/// Produces the tracked-PID set for one spawn. `inventory` is queried live
/// for descendant expansion (step 4) and the final filter (step 5), since
/// grandchildren that appeared after the `after` snapshot are still this
/// service's responsibility.
pub fn discover(input: &DiscoveryInput, inventory: &dyn ProcessInventory) -> Vec<Pid> {
    let exe_basename = basename(input.exe_path);
    let exe_stem = stem(input.exe_path);
    let exe_dir = input
        .exe_path
        .parent()
        .map(|p| p.display().to_string().to_lowercase())
        .unwrap_or_default();

    let mut allowed_names: HashSet<String> = input
        .process_names
        .iter()
        .map(|s| s.to_lowercase())
        .collect();
    if let Some(name) = &exe_basename {
        allowed_names.insert(name.clone());
    }

    let before_pids: HashSet<Pid> = input.before.keys().copied().collect();
    let new_pids: HashSet<Pid> = input
        .after
        .keys()
        .filter(|pid| !before_pids.contains(pid))
        .copied()
        .collect();

    let mut candidates: HashSet<Pid> = new_pids
        .iter()
        .copied()
        .filter(|&q| {
            let Some(info) = input.after.get(&q) else {
                return false;
            };
            is_candidate(
                q,
                info,
                input.after,
                &new_pids,
                input.direct_child,
                exe_basename.as_deref(),
                exe_stem.as_deref(),
                &exe_dir,
                &allowed_names,
                input.ancestor_depth,
                input.profile_flag,
            ) && profile_matches(info, input.profile_flag)
        })
        .collect();

    if candidates.is_empty() {
        if input.profile_flag.is_some() {
            return Vec::new();
        }
        candidates = new_pids;
    }

    let expanded = expand_descendants(candidates, inventory, input.profile_flag, input.descendant_limit);

    let mut tracked: Vec<Pid> = expanded
        .into_iter()
        .filter(|&pid| {
            inventory.process_alive(pid) && {
                let cmdline = inventory.cmdline(pid);
                profile_matches_cmdline(&cmdline, input.profile_flag)
            }
        })
        .collect();
    tracked.sort_unstable();
    tracked
}

#[allow(clippy::too_many_arguments)]
fn is_candidate(
    q: Pid,
    info: &ProcInfo,
    after: &HashMap<Pid, ProcInfo>,
    new_pids: &HashSet<Pid>,
    direct_child: Pid,
    exe_basename: Option<&str>,
    exe_stem: Option<&str>,
    exe_dir: &str,
    allowed_names: &HashSet<String>,
    ancestor_depth: u32,
    profile_flag: Option<&str>,
) -> bool {
    let parent_is_p_or_sibling = info
        .ppid
        .map(|ppid| ppid == direct_child || new_pids.contains(&ppid))
        .unwrap_or(false);

    let name_matches = exe_basename.map(|b| info.name == b).unwrap_or(false) || allowed_names.contains(&info.name);

    let name_contains_stem = exe_stem.map(|s| !s.is_empty() && info.name.contains(s)).unwrap_or(false);

    let image_under_exe_dir = !exe_dir.is_empty() && info.exe.starts_with(exe_dir);

    let basename_in_cmdline = exe_basename
        .map(|b| info.cmdline_joined().contains(b))
        .unwrap_or(false);

    let parent_name_matches = info
        .ppid
        .and_then(|ppid| after.get(&ppid))
        .map(|parent| exe_basename.map(|b| parent.name == b).unwrap_or(false))
        .unwrap_or(false);

    let ancestor_matches = has_matching_ancestor(q, after, direct_child, allowed_names, ancestor_depth, profile_flag);

    parent_is_p_or_sibling
        || name_matches
        || name_contains_stem
        || image_under_exe_dir
        || basename_in_cmdline
        || parent_name_matches
        || ancestor_matches
}

fn has_matching_ancestor(
    pid: Pid,
    after: &HashMap<Pid, ProcInfo>,
    direct_child: Pid,
    allowed_names: &HashSet<String>,
    max_depth: u32,
    profile_flag: Option<&str>,
) -> bool {
    let mut current = pid;
    for _ in 0..max_depth {
        let Some(info) = after.get(&current) else {
            return false;
        };
        let Some(ppid) = info.ppid else {
            return false;
        };
        let Some(ancestor) = after.get(&ppid) else {
            return false;
        };
        let name_or_root_matches = ppid == direct_child || allowed_names.contains(&ancestor.name);
        if name_or_root_matches && profile_matches(ancestor, profile_flag) {
            return true;
        }
        current = ppid;
    }
    false
}

fn expand_descendants(
    seed: HashSet<Pid>,
    inventory: &dyn ProcessInventory,
    profile_flag: Option<&str>,
    limit: usize,
) -> HashSet<Pid> {
    let mut visited: HashSet<Pid> = HashSet::new();
    let mut queue: VecDeque<Pid> = VecDeque::new();

    for pid in seed {
        if visited.len() >= limit {
            break;
        }
        if profile_matches_cmdline(&inventory.cmdline(pid), profile_flag) {
            visited.insert(pid);
            queue.push_back(pid);
        }
    }

    while let Some(current) = queue.pop_front() {
        if visited.len() >= limit {
            break;
        }
        for child in inventory.children(current, false) {
            if visited.len() >= limit {
                break;
            }
            if visited.contains(&child) {
                continue;
            }
            if profile_matches_cmdline(&inventory.cmdline(child), profile_flag) {
                visited.insert(child);
                queue.push_back(child);
            }
        }
    }

    visited
}

fn profile_matches(info: &ProcInfo, profile_flag: Option<&str>) -> bool {
    profile_matches_cmdline(&info.cmdline, profile_flag)
}

fn profile_matches_cmdline(cmdline: &[String], profile_flag: Option<&str>) -> bool {
    match profile_flag {
        Some(flag) => cmdline.iter().any(|token| token.contains(flag)),
        None => true,
    }
}

fn basename(path: &Path) -> Option<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().to_lowercase())
}

fn stem(path: &Path) -> Option<String> {
    path.file_stem()
        .map(|name| name.to_string_lossy().to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::inventory::ProcessInventory;
    use std::cell::RefCell;
    use std::path::PathBuf;

    struct FakeInventory {
        procs: RefCell<HashMap<Pid, ProcInfo>>,
    }

    impl FakeInventory {
        fn new(procs: HashMap<Pid, ProcInfo>) -> Self {
            Self {
                procs: RefCell::new(procs),
            }
        }
    }

    impl ProcessInventory for FakeInventory {
        fn snapshot(&self) -> HashMap<Pid, ProcInfo> {
            self.procs.borrow().clone()
        }

        fn process_alive(&self, pid: Pid) -> bool {
            self.procs.borrow().contains_key(&pid)
        }

        fn children(&self, pid: Pid, _recursive: bool) -> Vec<Pid> {
            self.procs
                .borrow()
                .values()
                .filter(|p| p.ppid == Some(pid))
                .map(|p| p.pid)
                .collect()
        }

        fn cmdline(&self, pid: Pid) -> Vec<String> {
            self.procs
                .borrow()
                .get(&pid)
                .map(|p| p.cmdline.clone())
                .unwrap_or_default()
        }
    }

    fn proc(pid: Pid, ppid: Option<Pid>, name: &str, exe: &str, cmdline: &[&str]) -> ProcInfo {
        ProcInfo {
            pid,
            ppid,
            name: name.to_string(),
            exe: exe.to_string(),
            cmdline: cmdline.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn direct_child_of_parent_is_tracked() {
        let before = HashMap::new();
        let mut after = HashMap::new();
        after.insert(1, proc(1, None, "launcher", "/opt/app/launcher", &["/opt/app/launcher"]));
        after.insert(2, proc(2, Some(1), "worker", "/opt/app/worker", &["/opt/app/worker"]));

        let inventory = FakeInventory::new(after.clone());
        let input = DiscoveryInput {
            before: &before,
            after: &after,
            direct_child: 1,
            profile_flag: None,
            exe_path: Path::new("/opt/app/launcher"),
            process_names: &[],
            ancestor_depth: 10,
            descendant_limit: 50,
        };

        let tracked = discover(&input, &inventory);
        assert_eq!(tracked, vec![2]);
    }

    #[test]
    fn empty_diff_yields_empty_tracked_set() {
        let before = HashMap::new();
        let after = HashMap::new();
        let inventory = FakeInventory::new(after.clone());
        let input = DiscoveryInput {
            before: &before,
            after: &after,
            direct_child: 1,
            profile_flag: None,
            exe_path: Path::new("/opt/app/launcher"),
            process_names: &[],
            ancestor_depth: 10,
            descendant_limit: 50,
        };
        assert!(discover(&input, &inventory).is_empty());
    }

    #[test]
    fn profile_filter_short_circuits_instead_of_falling_back() {
        let before = HashMap::new();
        let mut after = HashMap::new();
        after.insert(
            2,
            proc(2, Some(99), "worker", "/opt/app/worker", &["/opt/app/worker", "--user-data-dir=/other"]),
        );
        let inventory = FakeInventory::new(after.clone());
        let input = DiscoveryInput {
            before: &before,
            after: &after,
            direct_child: 1,
            profile_flag: Some("--user-data-dir=/mine"),
            exe_path: Path::new("/opt/app/launcher"),
            process_names: &[],
            ancestor_depth: 10,
            descendant_limit: 50,
        };
        assert!(discover(&input, &inventory).is_empty());
    }

    #[test]
    fn profile_filter_selects_only_matching_pids() {
        let before = HashMap::new();
        let mut after = HashMap::new();
        after.insert(
            2,
            proc(
                2,
                Some(1),
                "worker",
                "/opt/app/worker",
                &["/opt/app/worker", "--user-data-dir=/mine"],
            ),
        );
        after.insert(
            3,
            proc(
                3,
                Some(1),
                "worker",
                "/opt/app/worker",
                &["/opt/app/worker", "--user-data-dir=/other"],
            ),
        );
        let inventory = FakeInventory::new(after.clone());
        let input = DiscoveryInput {
            before: &before,
            after: &after,
            direct_child: 1,
            profile_flag: Some("--user-data-dir=/mine"),
            exe_path: Path::new("/opt/app/launcher"),
            process_names: &[],
            ancestor_depth: 10,
            descendant_limit: 50,
        };
        assert_eq!(discover(&input, &inventory), vec![2]);
    }

    #[test]
    fn descendant_expansion_respects_limit() {
        let before = HashMap::new();
        let mut after = HashMap::new();
        after.insert(1, proc(1, None, "launcher", "/opt/app/launcher", &["/opt/app/launcher"]));
        after.insert(2, proc(2, Some(1), "worker", "/opt/app/worker", &["/opt/app/worker"]));
        let mut inventory_map = after.clone();
        for pid in 10..20u32 {
            inventory_map.insert(pid, proc(pid, Some(2), "worker", "/opt/app/worker", &["/opt/app/worker"]));
        }
        let inventory = FakeInventory::new(inventory_map);
        let input = DiscoveryInput {
            before: &before,
            after: &after,
            direct_child: 1,
            profile_flag: None,
            exe_path: Path::new("/opt/app/launcher"),
            process_names: &[],
            ancestor_depth: 10,
            descendant_limit: 3,
        };
        let tracked = discover(&input, &inventory);
        assert!(tracked.len() <= 3);
    }

    #[test]
    fn unused_path_helper_smoke() {
        assert_eq!(basename(&PathBuf::from("/a/b/c.exe")), Some("c.exe".to_string()));
        assert_eq!(stem(&PathBuf::from("/a/b/c.exe")), Some("c".to_string()));
    }
}
