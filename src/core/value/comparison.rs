use super::types::Value;
use std::cmp::Ordering as CmpOrdering;
use std::hash::{Hash, Hasher};

// 整数按数值相等，与 Ord 保持一致
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == CmpOrdering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

/// 键排序使用的全序
///
/// NULL 排在所有非空值之前；不同宽度的整数按数值比较；浮点使用 total_cmp；
/// 其余不同类型按类型优先级排序。
impl Ord for Value {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        if let Some(ordering) = self.compare_values(other) {
            return ordering;
        }
        match (self, other) {
            (Value::Float(a), Value::Float(b)) => a.total_cmp(b),
            (a, b) => a.type_priority().cmp(&b.type_priority()),
        }
    }
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Value::Null => 0u8.hash(state),
            Value::Bool(b) => {
                1u8.hash(state);
                b.hash(state);
            }
            Value::Int8(_) | Value::Int16(_) | Value::Int32(_) | Value::Int64(_) => {
                2u8.hash(state);
                self.as_i64().hash(state);
            }
            Value::Float(f) => {
                3u8.hash(state);
                if *f == 0.0 {
                    0.0_f64.to_bits().hash(state);
                } else {
                    f.to_bits().hash(state);
                }
            }
            Value::String(s) => {
                4u8.hash(state);
                s.hash(state);
            }
            Value::Date(d) => {
                5u8.hash(state);
                d.hash(state);
            }
        }
    }
}

impl Value {
    fn type_priority(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Int8(_) | Value::Int16(_) | Value::Int32(_) | Value::Int64(_) => 2,
            Value::Float(_) => 3,
            Value::String(_) => 4,
            Value::Date(_) => 5,
        }
    }

    /// 范围代数使用的比较
    ///
    /// - NULL 只与 NULL 相等；NULL 与非空值的比较是排序决定（NULL 较小），不是错误
    /// - 不同宽度的整数按数值比较
    /// - 其余不同类型的值不可比较，返回 None，绝不做隐式转换
    pub fn compare_values(&self, other: &Value) -> Option<CmpOrdering> {
        match (self, other) {
            (Value::Null, Value::Null) => Some(CmpOrdering::Equal),
            (Value::Null, _) => Some(CmpOrdering::Less),
            (_, Value::Null) => Some(CmpOrdering::Greater),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
            (a, b) => match (a.as_i64(), b.as_i64()) {
                (Some(x), Some(y)) => Some(x.cmp(&y)),
                _ => None,
            },
        }
    }
}
