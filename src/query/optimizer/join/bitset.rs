//! 可连接节点集合位图
//!
//! 连接图节点子集直接用 `u64` 表示，第 i 位表示节点 i 参与。
//! 所有操作都是对单个机器字的自由函数，规划内循环中不做任何分配。
//! 容量固定为 64 个节点，超出由枚举器以 `TooManyTables` 拒绝，从不截断。

/// 位图容量
pub const CAPACITY: usize = 64;

pub type NodeSet = u64;

#[inline]
pub fn empty() -> NodeSet {
    0
}

#[inline]
pub fn of(i: usize) -> NodeSet {
    debug_assert!(i < CAPACITY);
    1u64 << i
}

#[inline]
pub fn count(s: NodeSet) -> usize {
    s.count_ones() as usize
}

#[inline]
pub fn is_empty(s: NodeSet) -> bool {
    s == 0
}

#[inline]
pub fn union(a: NodeSet, b: NodeSet) -> NodeSet {
    a | b
}

#[inline]
pub fn intersection(a: NodeSet, b: NodeSet) -> NodeSet {
    a & b
}

#[inline]
pub fn difference(a: NodeSet, b: NodeSet) -> NodeSet {
    a & !b
}

#[inline]
pub fn overlaps(a: NodeSet, b: NodeSet) -> bool {
    a & b != 0
}

#[inline]
pub fn contains(s: NodeSet, i: usize) -> bool {
    i < CAPACITY && s & of(i) != 0
}

#[inline]
pub fn is_subset(sub: NodeSet, sup: NodeSet) -> bool {
    sub & !sup == 0
}

/// sup 的下一个子集
///
/// 从 `empty()` 开始反复调用，按数值递增访问 sup 的每个子集恰好一次，最后一个是 sup 本身；
/// 对 sup 再调用一次回到 `empty()`。
#[inline]
pub fn next_subset(sub: NodeSet, sup: NodeSet) -> NodeSet {
    sub.wrapping_sub(sup) & sup
}

/// 最小元素下标
#[inline]
pub fn min(s: NodeSet) -> Option<usize> {
    if s == 0 {
        None
    } else {
        Some(s.trailing_zeros() as usize)
    }
}

/// 只含最小元素的单元素集合
#[inline]
pub fn min_subset(s: NodeSet) -> NodeSet {
    s & s.wrapping_neg()
}

/// 下标 0..=i 的全部节点
#[inline]
pub fn through(i: usize) -> NodeSet {
    if i + 1 >= CAPACITY {
        u64::MAX
    } else {
        (1u64 << (i + 1)) - 1
    }
}

/// 前 n 个节点
#[inline]
pub fn full(n: usize) -> NodeSet {
    if n == 0 {
        0
    } else {
        through(n - 1)
    }
}

/// 按下标递增遍历元素
pub fn iter(s: NodeSet) -> impl Iterator<Item = usize> {
    let mut rest = s;
    std::iter::from_fn(move || {
        let i = min(rest)?;
        rest &= rest - 1;
        Some(i)
    })
}

/// 用节点名渲染集合，供跟踪日志使用
pub fn to_string(s: NodeSet, names: &[String]) -> String {
    let parts: Vec<&str> = iter(s)
        .map(|i| names.get(i).map(String::as_str).unwrap_or("?"))
        .collect();
    format!("{{{}}}", parts.join(", "))
}
