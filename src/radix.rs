use ipnet::IpNet;
use std::net::IpAddr;

/// Binary trie over prefix bits, used to answer "does any inserted
/// network overlap this one?" in O(prefix length) instead of the O(n)
/// scan the original correlator ran per active route.
#[derive(Default)]
struct Node {
    children: [Option<Box<Node>>; 2],
    terminal: bool,
}

impl Node {
    fn insert(&mut self, bits: &[u8]) {
        let mut cur = self;
        for &bit in bits {
            cur = cur.children[bit as usize].get_or_insert_with(|| Box::new(Node::default()));
            if cur.terminal {
                // a shorter inserted prefix already covers this path
                return;
            }
        }
        cur.terminal = true;
        cur.children = [None, None];
    }

    /// True if any inserted network is an ancestor of, equal to, or a
    /// descendant of the path described by `bits`.
    fn overlaps(&self, bits: &[u8]) -> bool {
        let mut cur = self;
        for &bit in bits {
            if cur.terminal {
                return true;
            }
            match &cur.children[bit as usize] {
                Some(next) => cur = next,
                None => return false,
            }
        }
        // reached the end of the query prefix: either it's terminal itself
        // or it has any descendant at all (a longer bad network inside it)
        cur.terminal || cur.children[0].is_some() || cur.children[1].is_some()
    }
}

fn net_bits(net: &IpNet) -> Vec<u8> {
    let prefix_len = net.prefix_len() as usize;
    match net.network() {
        IpAddr::V4(v4) => {
            let octets = v4.octets();
            let mut bits = Vec::with_capacity(prefix_len);
            for i in 0..prefix_len {
                let byte = octets[i / 8];
                let bit = (byte >> (7 - (i % 8))) & 1;
                bits.push(bit);
            }
            bits
        }
        IpAddr::V6(v6) => {
            let octets = v6.octets();
            let mut bits = Vec::with_capacity(prefix_len);
            for i in 0..prefix_len {
                let byte = octets[i / 8];
                let bit = (byte >> (7 - (i % 8))) & 1;
                bits.push(bit);
            }
            bits
        }
    }
}

/// Separate v4/v6 tries, since bit-length and address family must never
/// be compared against each other.
#[derive(Default)]
pub struct OverlapTrie {
    v4: Node,
    v6: Node,
}

impl OverlapTrie {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, net: &IpNet) {
        let bits = net_bits(net);
        match net {
            IpNet::V4(_) => self.v4.insert(&bits),
            IpNet::V6(_) => self.v6.insert(&bits),
        }
    }

    pub fn overlaps(&self, net: &IpNet) -> bool {
        let bits = net_bits(net);
        match net {
            IpNet::V4(_) => self.v4.overlaps(&bits),
            IpNet::V6(_) => self.v6.overlaps(&bits),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match_overlaps() {
        let mut trie = OverlapTrie::new();
        trie.insert(&"10.0.0.0/24".parse().unwrap());
        assert!(trie.overlaps(&"10.0.0.0/24".parse().unwrap()));
    }

    #[test]
    fn contained_network_overlaps() {
        let mut trie = OverlapTrie::new();
        trie.insert(&"10.0.0.0/16".parse().unwrap());
        assert!(trie.overlaps(&"10.0.5.0/24".parse().unwrap()));
    }

    #[test]
    fn containing_network_overlaps() {
        let mut trie = OverlapTrie::new();
        trie.insert(&"10.0.5.0/24".parse().unwrap());
        assert!(trie.overlaps(&"10.0.0.0/16".parse().unwrap()));
    }

    #[test]
    fn disjoint_networks_do_not_overlap() {
        let mut trie = OverlapTrie::new();
        trie.insert(&"10.0.0.0/24".parse().unwrap());
        assert!(!trie.overlaps(&"192.168.0.0/24".parse().unwrap()));
    }

    #[test]
    fn v4_and_v6_never_cross_match() {
        let mut trie = OverlapTrie::new();
        trie.insert(&"::/0".parse().unwrap());
        assert!(!trie.overlaps(&"0.0.0.0/0".parse().unwrap()));
    }
}
